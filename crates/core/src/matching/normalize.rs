/// Normalize a title into the comparison key used for merging.
///
/// Lowercases, keeps alphabetic and numeric characters from any script,
/// treats whitespace as a separator, drops everything else, then collapses
/// separators to a single space and trims the ends. Depends on nothing but
/// its input.
pub fn normalize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_space = false;

    for c in title.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if !c.is_alphanumeric() {
            continue;
        }
        for lower in c.to_lowercase().filter(|l| l.is_alphanumeric()) {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(lower);
        }
    }

    out
}
