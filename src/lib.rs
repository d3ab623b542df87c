// SPDX-License-Identifier: GPL-3.0-or-later

//! Review listings by driving their action buttons.
//!
//! A listing page is a server-rendered element tree ([`markup`]) with one
//! form per listing. Each form carries buttons that reject, rescore or star
//! the listing through the backend. The [`controller::Controller`] binds those
//! buttons, sends their requests and writes the confirmed state back into the
//! page. The [`tui`] module presents a page in the terminal.

pub mod action;
mod config;
pub mod controller;
pub mod error;
pub mod logview;
pub mod markup;
mod page;
pub mod prelude;
pub mod table;
pub mod transport;
pub mod tui;

pub use config::{get_project_dirs, load_config, Config, ServerConfig, TableConfig, CONFIG_FILE};
pub use page::load_page;
