use pretty_assertions::assert_eq;
use vim_engine::{Buffer, Effect, Mode, Selection, SelectionType};

mod support;
use support::Harness;

const LINES: &str = "line1\nline2\nline3\nline4\nline5\nline6\nline7\n";

#[test]
fn test_dd_deletes_line() {
    let mut h = Harness::new("line one\nline two\nline three\n").at(9);
    h.keys("dd");
    assert_eq!(h.text(), "line one\nline three\n");
    assert_eq!(h.caret(), 9);
}

#[test]
fn test_count_dd_deletes_multiple_lines() {
    let mut h = Harness::new("a\nb\nc\nd\n").at(2);
    h.keys("2dd");
    assert_eq!(h.text(), "a\nd\n");
    assert_eq!(h.caret(), 2);
}

#[test]
fn test_dd_on_last_line() {
    let mut h = Harness::new("a\nb\nc\n").at(4);
    h.keys("dd");
    assert_eq!(h.text(), "a\nb\n");
    assert_eq!(h.caret(), 2);
}

#[test]
fn test_x_deletes_character() {
    let mut h = Harness::new("abc").at(1);
    h.keys("x");
    assert_eq!(h.text(), "ac");
    assert_eq!(h.caret(), 1);
}

#[test]
fn test_operator_counts_multiply() {
    let mut h = Harness::new("a b c d e f g");
    h.keys("2d2w");
    assert_eq!(h.text(), "e f g");
}

#[test]
fn test_cw_acts_like_ce() {
    let mut h = Harness::new("foo bar");
    h.keys("cwbaz<Esc>");
    assert_eq!(h.text(), "baz bar");
    assert_eq!(h.caret(), 2);
    assert_eq!(h.mode(), Mode::Normal);
}

#[test]
fn test_shift_d_deletes_to_line_end() {
    let mut h = Harness::new("hello world").at(5);
    h.keys("D");
    assert_eq!(h.text(), "hello");
    assert_eq!(h.caret(), 4);
}

#[test]
fn test_text_objects() {
    let mut h = Harness::new("one two three").at(5);
    h.keys("diw");
    assert_eq!(h.text(), "one  three");

    let mut h = Harness::new("f(a, b)").at(3);
    h.keys("ci(x<Esc>");
    assert_eq!(h.text(), "f(x)");
}

#[test]
fn test_case_operators() {
    let mut h = Harness::new("hello world");
    h.keys("gUiw");
    assert_eq!(h.text(), "HELLO world");

    h.keys("~");
    assert_eq!(h.text(), "hELLO world");
    assert_eq!(h.caret(), 1);
}

#[test]
fn test_indent_operator() {
    let mut h = Harness::new("foo\nbar\n");
    h.ex("set sw=4 et");
    h.keys(">j");
    assert_eq!(h.text(), "    foo\n    bar\n");
    assert_eq!(h.caret(), 4);

    h.keys("<lt><lt>");
    assert_eq!(h.text(), "foo\n    bar\n");
}

#[test]
fn test_join_and_replace() {
    let mut h = Harness::new("a\n  b\n");
    h.keys("J");
    assert_eq!(h.text(), "a b\n");

    let mut h = Harness::new("abc");
    h.keys("rx");
    assert_eq!(h.text(), "xbc");
    h.keys("3rz");
    assert_eq!(h.text(), "zzz");
}

#[test]
fn test_charwise_visual_delete() {
    let mut h = Harness::new("abc\ndef\n").at(1);
    h.keys("v");
    assert_eq!(h.mode(), Mode::Visual(SelectionType::CharWise));
    h.keys("j");
    assert_eq!(
        h.buf.selections(),
        &[Selection { anchor: 1, head: 5, kind: SelectionType::CharWise }]
    );

    h.keys("d");
    assert_eq!(h.text(), "af\n");
    assert_eq!(h.caret(), 1);
    assert_eq!(h.mode(), Mode::Normal);
    assert!(h.buf.selections().is_empty());
}

#[test]
fn test_linewise_visual_delete() {
    let mut h = Harness::new("1\n2\n3\n4\n5\n");
    h.keys("Vjjd");
    assert_eq!(h.text(), "4\n5\n");
    assert_eq!(h.caret(), 0);

    let mut h = Harness::new("1\n2\n3\n4\n5\n");
    h.keys("jVjjd");
    assert_eq!(h.text(), "1\n5\n");
    assert_eq!(h.caret(), 2);
}

#[test]
fn test_multi_caret_edits_apply_at_every_caret() {
    let mut h = Harness::new("ab\ncd\n");
    h.buf.set_carets(&[0, 3]);
    h.keys("~");
    assert_eq!(h.text(), "Ab\nCd\n");

    h.buf.set_carets(&[1, 4]);
    h.keys("rx");
    assert_eq!(h.text(), "Ax\nCx\n");
}

#[test]
fn test_multi_caret_failure_leaves_buffer_untouched() {
    // the primary caret sits on an empty line
    let mut h = Harness::new("\nab\n");
    h.buf.set_carets(&[0, 1]);
    assert_eq!(h.keys("~"), vec![Effect::Bell]);
    assert_eq!(h.text(), "\nab\n");

    // no room for two chars on the first line
    let mut h = Harness::new("a\nbc\n");
    h.buf.set_carets(&[0, 2]);
    assert_eq!(h.keys("2rx"), vec![Effect::Bell]);
    assert_eq!(h.text(), "a\nbc\n");

    // the secondary caret is on the last line
    let mut h = Harness::new("a\nb\nc\n");
    h.buf.set_carets(&[0, 4]);
    assert_eq!(h.keys("J"), vec![Effect::Bell]);
    assert_eq!(h.text(), "a\nb\nc\n");
}

#[test]
fn test_visual_text_object_and_swap() {
    let mut h = Harness::new("one two three").at(5);
    h.keys("viwd");
    assert_eq!(h.text(), "one  three");

    let mut h = Harness::new("abcdef");
    h.keys("vllo");
    assert_eq!(h.caret(), 0);
    h.keys("U");
    assert_eq!(h.text(), "ABCdef");
}

#[test]
fn test_gv_restores_last_selection() {
    let mut h = Harness::new(LINES);
    h.keys("Vj<Esc>");
    assert_eq!(h.mode(), Mode::Normal);

    h.keys("gv");
    assert_eq!(h.mode(), Mode::Visual(SelectionType::LineWise));
    assert_eq!(
        h.buf.selections(),
        &[Selection { anchor: 0, head: 6, kind: SelectionType::LineWise }]
    );
}

#[test]
fn test_count_gv_scales_selection() {
    let mut h = Harness::new(LINES);
    h.keys("Vj<Esc>3gvd");
    assert_eq!(h.text(), "line7\n");
}

#[test]
fn test_visual_marks() {
    let mut h = Harness::new(LINES).at(7);
    h.keys("vjj<Esc>");
    let marks = h.engine.marks(h.id).unwrap();
    assert_eq!(marks.get('<').unwrap(), 7);
    assert_eq!(marks.get('>').unwrap(), 19);
}

#[test]
fn test_block_insert() {
    let mut h = Harness::new("abc\ndef\nghi\n");
    h.keys("<C-v>jjIX<Esc>");
    assert_eq!(h.text(), "Xabc\nXdef\nXghi\n");
    assert_eq!(h.caret(), 0);
    assert_eq!(h.buf.carets(), vec![0]);
}

#[test]
fn test_block_append_to_line_ends() {
    let mut h = Harness::new("ab\nabcd\n");
    h.keys("<C-v>j$AX<Esc>");
    assert_eq!(h.text(), "abX\nabcdX\n");
}

#[test]
fn test_block_delete() {
    let mut h = Harness::new("abcd\nefgh\n").at(1);
    h.keys("<C-v>jld");
    assert_eq!(h.text(), "ad\neh\n");
}

#[test]
fn test_dot_repeats_last_change() {
    let mut h = Harness::new("one two three four");
    h.keys("dw");
    h.keys(".");
    assert_eq!(h.text(), "three four");

    let mut h = Harness::new("one two");
    h.keys("ciwfoo<Esc>w.");
    assert_eq!(h.text(), "foo foo");
}

#[test]
fn test_dot_with_new_count() {
    let mut h = Harness::new("a b c d e f");
    h.keys("dw");
    h.keys("3.");
    assert_eq!(h.text(), "e f");
}

#[test]
fn test_x_repeats_through_alias() {
    let mut h = Harness::new("abcdef");
    h.keys("x..");
    assert_eq!(h.text(), "def");
}

#[test]
fn test_select_mode_typing_replaces() {
    let mut h = Harness::new("abc def");
    h.keys("gh");
    assert_eq!(h.mode(), Mode::Select(SelectionType::CharWise));
    h.keys("X");
    assert_eq!(h.mode(), Mode::Insert);
    h.keys("<Esc>");
    assert_eq!(h.text(), "Xbc def");
    assert_eq!(h.mode(), Mode::Normal);
}

#[test]
fn test_undo_redo_whole_insert() {
    let mut h = Harness::new("abc");
    h.keys("ihello <Esc>");
    assert_eq!(h.text(), "hello abc");
    h.keys("u");
    assert_eq!(h.text(), "abc");
    h.keys("<C-r>");
    assert_eq!(h.text(), "hello abc");
}

#[test]
fn test_escape_cancels_pending_operator() {
    let mut h = Harness::new("abc");
    h.keys("d");
    assert!(matches!(h.mode(), Mode::OpPending { .. }));
    h.keys("<Esc>");
    assert_eq!(h.mode(), Mode::Normal);
    h.keys("l");
    assert_eq!(h.text(), "abc");
    assert_eq!(h.caret(), 1);
}
