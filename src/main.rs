fn main() -> anyhow::Result<()> {
    stickies_sync::run()
}
