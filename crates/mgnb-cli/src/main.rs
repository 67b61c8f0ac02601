mod command;
mod csv_report;
mod schema;
mod util;

fn main() -> anyhow::Result<()> {
    command::run()
}
