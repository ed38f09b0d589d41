//! `canonicalize` command: print the cache key each raw link maps to

use crate::core::canonicalizer::canonicalize;

/// `raw<TAB>canonical` for every input, in order.
pub fn canonical_lines<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    urls.into_iter()
        .map(|raw| {
            let raw = raw.as_ref();
            format!("{}\t{}", raw, canonicalize(raw))
        })
        .collect()
}

pub fn run_canonicalize(urls: &[String]) {
    for line in canonical_lines(urls) {
        println!("{}", line);
    }
}
