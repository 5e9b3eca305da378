use anyhow::Result;

fn main() -> Result<()> {
    relget::cli::run()
}
