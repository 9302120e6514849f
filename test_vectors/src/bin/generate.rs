fn main() -> anyhow::Result<()> {
    print!("{}", test_vectors::generate_json()?);
    Ok(())
}
