//! Helpers for dialogue scripts with inline speaker tags.

/// Collects the distinct speaker tags (`[S1]`, `[S2]`, ...) appearing in a
/// script, in order of first appearance.  Anything that is not a well-formed
/// tag, such as `[S]` or an unclosed `[S1`, is ignored.
pub fn distinct_speaker_tags(texts: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for text in texts {
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'[' && i + 2 < bytes.len() && bytes[i + 1] == b'S' {
                let mut j = i + 2;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if j > i + 2 && j < bytes.len() && bytes[j] == b']' {
                    // Tag bytes are all ASCII, so slicing here stays on
                    // char boundaries even in non-ASCII scripts.
                    let tag = &text[i..=j];
                    if !tags.iter().any(|known| known == tag) {
                        tags.push(tag.to_string());
                    }
                    i = j + 1;
                    continue;
                }
            }
            i += 1;
        }
    }
    tags
}
