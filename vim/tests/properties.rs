use std::sync::Arc;

use proptest::prelude::*;
use vim_engine::command::{Command, CommandKind, CommandSpec};
use vim_engine::marks::Marks;
use vim_engine::range::{ResolvedRange, combine_counts, resolve_range};
use vim_engine::registry::CommandLookup;
use vim_engine::{
    Buffer, CommandRegistry, MapMode, Mode, MotionContext, Operator, Options, RopeBuffer,
    SelectionType, parse_keys,
};

mod support;
use support::Harness;

fn text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("hello world\n".to_string()),
        Just("fn main() {\n    let x = (1 + 2);\n}\n".to_string()),
        Just("one. two three.\n\nfour five\n".to_string()),
        Just("a\n\n\nb\n".to_string()),
        prop::collection::vec("[a-z ]{0,12}", 1..6).prop_map(|lines| {
            let mut text = lines.join("\n");
            text.push('\n');
            text
        }),
    ]
}

fn motion_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("h"),
        Just("j"),
        Just("k"),
        Just("l"),
        Just("w"),
        Just("b"),
        Just("e"),
        Just("W"),
        Just("B"),
        Just("E"),
        Just("ge"),
        Just("0"),
        Just("^"),
        Just("$"),
        Just("gg"),
        Just("G"),
        Just("}"),
        Just("{"),
        Just("("),
        Just(")"),
        Just("%"),
        Just("+"),
        Just("-"),
        Just("H"),
        Just("L"),
        Just("2j"),
        Just("3l"),
    ]
}

fn lookup(registry: &CommandRegistry, class: MapMode, keys: &str) -> Arc<CommandSpec> {
    let keys = parse_keys(keys).unwrap();
    match registry.lookup(class, &keys) {
        CommandLookup::Found(spec) => spec,
        _ => panic!("no command bound to {keys:?}"),
    }
}

/// The motion's target and its range under `d`, for the given counts.
fn resolve(
    buf: &RopeBuffer,
    motion: &Command,
    caret: usize,
    counts: (usize, usize),
    operator: Option<Operator>,
) -> (vim_engine::Result<usize>, vim_engine::Result<ResolvedRange>) {
    let options = Options::default();
    let marks = Marks::default();
    let ctx = MotionContext {
        caret,
        count: counts.0,
        raw_count: counts.1,
        argument: None,
        mode: Mode::Normal,
        operator,
        options: &options,
        column: None,
        marks: &marks,
        last_find: None,
        last_search: None,
    };
    let CommandKind::Motion(m) = motion.kind() else {
        panic!("{} is not a motion", motion.spec.id);
    };
    (m.offset(buf, &ctx), resolve_range(buf, motion, &ctx, None))
}

fn counted_motion_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("h"),
        Just("j"),
        Just("k"),
        Just("l"),
        Just("w"),
        Just("b"),
        Just("e"),
        Just("ge"),
        Just("$"),
        Just("0"),
        Just("^"),
        Just("G"),
        Just("gg"),
        Just("%"),
        Just("}"),
        Just("{"),
        Just("+"),
        Just("-"),
        Just("<Bar>"),
    ]
}

fn command_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("d"),
        Just("c"),
        Just("y"),
        Just("v"),
        Just("V"),
        Just("i"),
        Just("a"),
        Just("o"),
        Just("x"),
        Just("w"),
        Just("/"),
        Just(":"),
        Just("\""),
        Just("f"),
        Just("r"),
        Just("3"),
        Just("g"),
    ]
}

proptest! {
    #[test]
    fn motions_keep_caret_in_normal_bounds(
        text in text_strategy(),
        motions in prop::collection::vec(motion_strategy(), 0..20),
    ) {
        let mut h = Harness::new(&text);
        for motion in &motions {
            h.keys(motion);
        }
        prop_assert_eq!(h.text(), text);
        prop_assert_eq!(h.mode(), Mode::Normal);

        let caret = h.caret();
        let line = h.buf.line_of(caret);
        prop_assert!(caret <= h.buf.len_chars());
        if h.buf.line_len(line) > 0 {
            prop_assert!(caret < h.buf.line_end(line));
        }
    }

    #[test]
    fn typed_text_is_inserted_and_undone(
        text in text_strategy(),
        typed in "[a-z ]{1,20}",
    ) {
        let mut h = Harness::new(&text);
        h.keys(&format!("i{typed}<Esc>"));
        prop_assert_eq!(h.text(), format!("{typed}{text}"));
        prop_assert_eq!(h.mode(), Mode::Normal);

        h.keys("u");
        prop_assert_eq!(h.text(), text);
    }

    #[test]
    fn counted_dd_removes_leading_lines(total in 1usize..8, count in 1usize..8) {
        let lines: Vec<String> = (0..total).map(|i| format!("line{i}\n")).collect();
        let text = lines.concat();
        let mut h = Harness::new(&text);
        h.keys(&format!("{count}dd"));
        // a count past the last line fails when already on it
        let expected = if total == 1 && count > 1 {
            text.clone()
        } else {
            lines[count.min(total)..].concat()
        };
        prop_assert_eq!(h.text(), expected);

        h.keys("u");
        prop_assert_eq!(h.text(), text);
    }

    #[test]
    fn escape_always_returns_to_normal(
        text in text_strategy(),
        keys in prop::collection::vec(command_strategy(), 0..12),
    ) {
        let mut h = Harness::new(&text);
        h.keys(&keys.concat());
        h.keys("<Esc><Esc><Esc>");

        prop_assert_eq!(h.mode(), Mode::Normal);
        let snap = h.engine.snapshot(h.id).unwrap();
        prop_assert_eq!(snap.pending_keys, "");
        prop_assert_eq!(snap.pending_count, None);
        prop_assert!(snap.command_line.is_none());
        prop_assert!(h.buf.selections().is_empty());
    }

    #[test]
    fn linewise_yank_covers_whole_lines(
        lines in prop::collection::vec("[a-z ]{1,10}", 2..7),
        first in 0usize..6,
        extra in 0usize..6,
        col in 0usize..10,
    ) {
        let first = first % lines.len();
        let extra = extra % (lines.len() - first);
        let col = col % lines[first].chars().count();
        let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
        let start: usize = lines[..first].iter().map(|l| l.chars().count() + 1).sum();

        let mut h = Harness::new(&text).at(start + col);
        if extra == 0 {
            h.keys("yy");
        } else {
            h.keys(&format!("y{extra}j"));
        }

        let content = h.engine.context().registers.read().get('"', None).unwrap();
        let expected: String = lines[first..=first + extra].iter().map(|l| format!("{l}\n")).collect();
        prop_assert_eq!(content.kind, SelectionType::LineWise);
        prop_assert_eq!(content.text, expected);
        prop_assert_eq!(h.text(), text);
        prop_assert_eq!(h.caret(), start + col);
    }

    #[test]
    fn deleted_chars_put_back_restore_text(
        line in "[a-z]{2,16}",
        at in 0usize..16,
        count in 1usize..16,
    ) {
        let len = line.chars().count();
        let at = at % (len - 1);
        // leave a char after the deleted run so the caret stays put
        let count = 1 + (count - 1) % (len - at - 1);
        let text = format!("{line}\nrest\n");

        let mut h = Harness::new(&text).at(at);
        h.keys(&format!("{count}x"));
        prop_assert_eq!(h.text().chars().count(), text.chars().count() - count);
        prop_assert_eq!(h.caret(), at);

        h.keys("P");
        prop_assert_eq!(h.text(), text);
    }

    #[test]
    fn count_zero_resolves_like_no_count(
        lines in prop::collection::vec("[a-z (){}]{0,10}", 1..6),
        line in 0usize..6,
        col in 0usize..10,
        motion in counted_motion_strategy(),
    ) {
        let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
        let buf = RopeBuffer::new(&text);
        let line = line % lines.len();
        let len = buf.line_len(line);
        let caret = buf.line_start(line) + if len == 0 { 0 } else { col % len };

        let registry = CommandRegistry::with_defaults();
        let spec = lookup(&registry, MapMode::NORMAL, motion);
        let zero = Command::new(spec.clone(), 0, None, vec![]);
        let none = Command::new(spec, 1, None, vec![]);
        let uncounted = (1, 0);

        prop_assert_eq!(
            resolve(&buf, &zero, caret, (zero.count, zero.raw_count), None),
            resolve(&buf, &none, caret, uncounted, None)
        );

        let delete = Command::new(lookup(&registry, MapMode::NORMAL, "d"), 0, None, vec![]);
        prop_assert_eq!(
            resolve(&buf, &zero, caret, combine_counts(&delete, &zero), Some(Operator::Delete)),
            resolve(&buf, &none, caret, uncounted, Some(Operator::Delete))
        );
    }

    #[test]
    fn yanked_text_put_back_in_place(
        lines in prop::collection::vec("[a-z ]{1,12}", 1..4),
        at in 0usize..12,
        motion in prop_oneof![
            Just("l"), Just("3l"), Just("e"), Just("2e"), Just("w"),
            Just("$"), Just("iw"), Just("aw"), Just("b"), Just("0"),
        ],
    ) {
        let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
        let at = at % lines[0].chars().count();

        let mut h = Harness::new(&text).at(at);
        h.keys(&format!("y{motion}"));
        let content = h.engine.context().registers.read().get('"', None);
        prop_assume!(content.is_ok());
        let content = content.unwrap();
        prop_assume!(content.kind == SelectionType::CharWise);
        prop_assert_eq!(h.text(), text.clone());

        let start = h.caret();
        let chars: Vec<char> = text.chars().collect();
        let yanked: String = chars[start..start + content.text.chars().count()].iter().collect();
        prop_assert_eq!(&yanked, &content.text);

        h.keys("P");
        let before: String = chars[..start].iter().collect();
        let after: String = chars[start..].iter().collect();
        prop_assert_eq!(h.text(), format!("{before}{yanked}{after}"));

        h.keys("u");
        prop_assert_eq!(h.text(), text);
    }
}
