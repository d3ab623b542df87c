// SPDX-License-Identifier: GPL-3.0-or-later

use directories::ProjectDirs;
use lazy_static::lazy_static;
use log::info;
use serde::{de::DeserializeOwned, Deserialize};

use crate::{action::Variant, controller::ControllerOptions, prelude::*, table::WidthMode};

pub const CONFIG_FILE: &str = "listing-review.toml";

pub fn get_project_dirs() -> Option<&'static ProjectDirs> {
    lazy_static! {
        static ref PROJECT_DIRS: Option<ProjectDirs> =
            ProjectDirs::from("experimental", "clapbot", "listing-review");
    }
    PROJECT_DIRS.as_ref()
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub user_agent: String,
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/".into(),
            user_agent: "listing-review".into(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TableConfig {
    pub width: WidthMode,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub table: TableConfig,
    pub variant: Variant,
}
impl Config {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            variant: self.variant,
            width: self.table.width,
        }
    }
}

pub fn load_config_impl<C: DeserializeOwned + Default>(name: &str) -> Result<C> {
    let Some(dirs) = get_project_dirs() else {
        info!("No home directory; using default {name}");
        return Ok(C::default());
    };

    let path = dirs.config_dir().join(name);
    if !path.exists() {
        info!("{} not found; using defaults", path.display());
        return Ok(C::default());
    }

    try_forward(
        || Ok(toml::from_str(&std::fs::read_to_string(&path)?)?),
        || format!("Error loading {}", path.display()),
    )
}

/// Load the TOML file `name` from the configuration directory, falling back
/// to defaults if it does not exist.
pub fn load_config<'a, C: DeserializeOwned + Default>(name: impl Into<&'a str>) -> Result<C> {
    load_config_impl(name.into())
}
