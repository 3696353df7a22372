use anyhow::Context;

fn main() -> anyhow::Result<()> {
    aqhi::run().context("aqhi failed")?;
    Ok(())
}
