use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use vim_engine::{Effect, Engine, Error, Evaluator, MapMode, Mode, parse_keys};
use vim_engine::mapping::{MappingInfo, Owner};

mod support;
use support::Harness;

fn plug_mappings(h: &mut Harness) {
    for line in [
        "nmap j <Plug>A",
        "nmap jj <Plug>B",
        "nnoremap <Plug>A x",
        "nnoremap <Plug>B dd",
    ] {
        assert_eq!(h.ex(line), vec![]);
    }
}

#[test]
fn test_ambiguous_prefix_resolves_on_timeout() {
    let mut h = Harness::new("abc\ndef\n");
    plug_mappings(&mut h);
    let t0 = Instant::now();

    let effects = h.engine.handle_keys_at(h.id, &mut h.buf, "j", t0).unwrap();
    assert_eq!(effects, vec![Effect::Pending]);
    assert_eq!(h.engine.deadline(h.id), Some(t0 + Duration::from_millis(1000)));
    assert_eq!(h.engine.snapshot(h.id).unwrap().pending_keys, "j");

    // not yet
    h.engine.handle_timeout(h.id, &mut h.buf, t0 + Duration::from_millis(999));
    assert_eq!(h.text(), "abc\ndef\n");

    h.engine.handle_timeout(h.id, &mut h.buf, t0 + Duration::from_millis(1000));
    assert_eq!(h.text(), "bc\ndef\n");
    assert_eq!(h.engine.deadline(h.id), None);
}

#[test]
fn test_second_key_completes_longer_mapping() {
    let mut h = Harness::new("abc\ndef\n");
    plug_mappings(&mut h);
    let t0 = Instant::now();

    h.engine.handle_keys_at(h.id, &mut h.buf, "j", t0).unwrap();
    h.engine
        .handle_keys_at(h.id, &mut h.buf, "j", t0 + Duration::from_millis(100))
        .unwrap();
    assert_eq!(h.text(), "def\n");
    assert_eq!(h.mode(), Mode::Normal);
}

#[test]
fn test_unrelated_key_flushes_prefix() {
    let mut h = Harness::new("abc\ndef\n");
    plug_mappings(&mut h);

    h.keys("jl");
    assert_eq!(h.text(), "bc\ndef\n");
    assert_eq!(h.caret(), 1);
}

#[test]
fn test_notimeout_waits_forever() {
    let mut h = Harness::new("abc\ndef\n");
    plug_mappings(&mut h);
    h.ex("set notimeout");
    let t0 = Instant::now();

    h.engine.handle_keys_at(h.id, &mut h.buf, "j", t0).unwrap();
    assert_eq!(h.engine.deadline(h.id), None);
    let effects = h.engine.handle_timeout(h.id, &mut h.buf, t0 + Duration::from_secs(3600));
    assert_eq!(effects, vec![Effect::Pending]);
    assert_eq!(h.text(), "abc\ndef\n");
}

#[test]
fn test_map_to_itself_runs_builtin() {
    let mut h = Harness::new("abc");
    h.ex("nmap x x");
    h.keys("x");
    assert_eq!(h.text(), "bc");
}

#[test]
fn test_mutual_recursion_is_capped() {
    let mut h = Harness::new("abc");
    h.ex("nmap Q W");
    h.ex("nmap W Q");

    let effects = h.keys("Q");
    assert!(effects.contains(&Effect::Error(Error::RecursiveMappingOverflow { depth: 1000 })));
    assert_eq!(h.text(), "abc");
    assert_eq!(h.mode(), Mode::Normal);

    // the next key is handled normally
    h.keys("x");
    assert_eq!(h.text(), "bc");
}

#[test]
fn test_noremap_does_not_resolve_again() {
    let mut h = Harness::new("abc\ndef\n");
    h.ex("nmap x dd");
    h.ex("nnoremap Q x");
    h.keys("Q");
    assert_eq!(h.text(), "bc\ndef\n");

    let mut h = Harness::new("abc\ndef\n");
    h.ex("nmap x dd");
    h.ex("nmap Q x");
    h.keys("Q");
    assert_eq!(h.text(), "def\n");
}

#[test]
fn test_insert_mode_mapping() {
    let mut h = Harness::new("");
    h.ex("inoremap jk <Esc>");
    h.keys("iabjk");
    assert_eq!(h.text(), "ab");
    assert_eq!(h.mode(), Mode::Normal);

    // a lone `j` is typed once the next key rules the mapping out
    h.keys("Aj!<Esc>");
    assert_eq!(h.text(), "abj!");
}

#[test]
fn test_nowait_mapping_skips_wait() {
    let mut h = Harness::new("abc\ndef\n");
    h.ex("nmap jj dd");
    h.ex("nnoremap <nowait> j x");
    let effects = h.keys("j");
    assert!(!effects.contains(&Effect::Pending));
    assert_eq!(h.text(), "bc\ndef\n");
}

struct Canned(&'static str);

impl Evaluator for Canned {
    fn evaluate(&mut self, expression: &str) -> Result<String, String> {
        match expression {
            "Delete()" => Ok(self.0.to_string()),
            other => Err(format!("unknown function {other}")),
        }
    }
}

#[test]
fn test_expression_mapping() {
    let engine = Engine::builder().evaluator(Box::new(Canned("dd"))).build();
    let mut h = Harness::with_engine(engine, "abc\ndef\n");
    h.ex("nmap <expr> Q Delete()");
    h.ex("nmap <expr> W Missing()");

    h.keys("Q");
    assert_eq!(h.text(), "def\n");

    let effects = h.keys("W");
    assert!(effects.contains(&Effect::Error(Error::Expression("unknown function Missing()".into()))));
    assert_eq!(h.text(), "def\n");
}

#[test]
fn test_owner_removal() {
    let mut h = Harness::new("abc\ndef\n");
    let owner = Owner(7);
    {
        let mut table = h.engine.context().mappings.write();
        let info = MappingInfo::keys(parse_keys("Q").unwrap(), parse_keys("dd").unwrap(), MapMode::NORMAL, false);
        table.add(info.with_owner(owner)).unwrap();
        let info = MappingInfo::keys(parse_keys("W").unwrap(), parse_keys("x").unwrap(), MapMode::NORMAL, false);
        table.add(info.with_owner(owner)).unwrap();
        assert_eq!(table.remove_owner(owner), 2);
    }

    let effects = h.keys("Q");
    assert!(effects.contains(&Effect::Bell));
    assert_eq!(h.text(), "abc\ndef\n");
}

#[test]
fn test_mapping_leader() {
    let mut h = Harness::new("abc");
    h.ex("set mapleader=,");
    h.ex("nnoremap <Leader>d x");
    h.keys(",d");
    assert_eq!(h.text(), "bc");
}
