//! Check the engine against a test vector file, given as the only argument.

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .context("usage: check <test_vectors.json>")?;
    let json =
        std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path))?;
    let cases = test_vectors::parse_test_vectors(&json)?;
    test_vectors::check_test_vectors(&cases)?;
    println!("{}: {} cases ok", path, cases.cases.len());
    Ok(())
}
