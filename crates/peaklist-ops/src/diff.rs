use similar::TextDiff;

pub fn build_unified_diff(original: &str, modified: &str, path: &str) -> Option<String> {
    if original == modified {
        return None;
    }

    let diff = TextDiff::from_lines(original, modified);
    let mut output = Vec::new();
    let header_old = format!("a/{path}");
    let header_new = format!("b/{path}");

    diff.unified_diff()
        .header(&header_old, &header_new)
        .to_writer(&mut output)
        .expect("writing diff to string never fails");

    Some(String::from_utf8(output).expect("diff output is valid utf-8"))
}
