fn main() -> anyhow::Result<()> {
    tbas::run()
}
