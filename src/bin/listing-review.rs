// SPDX-License-Identifier: GPL-3.0-or-later

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use log::{debug, LevelFilter};
use ratatui::DefaultTerminal;

use listing_review::{
    action::Variant,
    controller::Controller,
    load_config, load_page,
    prelude::*,
    table::WidthMode,
    transport::{HttpTransport, MockTransport, Transport},
    tui::{App, Exit},
    Config, CONFIG_FILE,
};

#[derive(Parser, Debug)]
struct Cli {
    /// Page to open: a JSON page file, or a URL on the listing server.
    page: String,

    /// Listing server to talk to (overrides the configuration file).
    #[clap(long)]
    base_url: Option<String>,

    /// remove-row or toggle-and-advance.
    #[clap(long)]
    variant: Option<Variant>,

    /// fixed or auto.
    #[clap(long)]
    width: Option<WidthMode>,

    /// Answer requests from canned replies in this directory.
    #[clap(long)]
    mock_data: Option<PathBuf>,

    #[clap(long)]
    log_file: Option<String>,
}

fn run(
    terminal: &mut DefaultTerminal,
    mut page: String,
    config: &Config,
    transport: Arc<dyn Transport>,
) -> Result<()> {
    loop {
        let doc = load_page(&page, transport.as_ref())?;
        let controller =
            Controller::initialize(doc, config.controller_options(), transport.clone())?;
        match App::new(controller, page.clone()).run(terminal)? {
            Exit::Quit => return Ok(()),
            Exit::Navigate(url) => page = url,
        }
    }
}

fn do_main() -> Result<()> {
    let args = Cli::parse();

    if std::env::var("RUST_LOG").is_ok() {
        env_logger::builder()
            .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
            .init();
    } else {
        tui_logger::init_logger(LevelFilter::Debug)?;
        tui_logger::set_default_level(LevelFilter::Debug);
        if let Some(log_file) = &args.log_file {
            tui_logger::set_log_file(log_file)?;
        }
    }
    debug!("Starting up");

    let mut config: Config = load_config(CONFIG_FILE)?;
    if let Some(base_url) = args.base_url {
        config.server.base_url = base_url;
    }
    if let Some(variant) = args.variant {
        config.variant = variant;
    }
    if let Some(width) = args.width {
        config.table.width = width;
    }

    let transport: Arc<dyn Transport> = match args.mock_data {
        Some(path) => Arc::new(MockTransport::new(path)),
        None => Arc::new(HttpTransport::new(
            &config.server.base_url,
            &config.server.user_agent,
        )?),
    };

    let mut terminal = ratatui::try_init()?;
    let result = run(&mut terminal, args.page, &config, transport);
    ratatui::restore();
    result
}

fn main() {
    if let Err(err) = do_main() {
        println!("{}", err);
        std::process::exit(1);
    }
}
