//! dossier - conversational search over a catalog of person folders.
//!
//! A catalog is a flat list of file paths. Every directory directly holding
//! files below the configured base folder is a person folder; its name
//! carries the person's name and birth date. Users find folders by typing
//! name words or dates, page through ambiguous matches, receive the folder's
//! summary and documents, and can ask an AI assistant about a document.
//!
//! The [`Bot`] dispatcher is transport agnostic: front-ends turn updates into
//! [`bot::Input`] values and deliver the returned [`reply::Reply`] values.
//! The crate ships a console front-end ([`chat`]) and an MCP stdio server
//! ([`mcp`]).
//!
//! # Quick start
//!
//! ```no_run
//! use dossier::{CatalogIndex, Config, DataDir};
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let config = Config::load(&Config::locate(None, &data_dir)).unwrap();
//! let catalog = CatalogIndex::load(
//!     &config.file_list(),
//!     &config.base_folder_name,
//!     config.name_cleaner().unwrap(),
//! )
//! .unwrap();
//!
//! for folder in catalog.search("ivanov 1985") {
//!     println!("{} ({folder})", catalog.display_name(&folder));
//! }
//! ```

pub mod access;
pub mod assistant;
pub mod birthdays;
pub mod bot;
pub mod callback;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod data_dir;
pub mod error;
pub mod handles;
pub mod matcher;
pub mod mcp;
pub mod normalize;
pub mod pager;
pub mod rate_limit;
pub mod render;
pub mod reply;
pub mod selector;
pub mod session;
pub mod settings_db;
pub mod text_util;

pub use bot::Bot;
pub use catalog::CatalogIndex;
pub use config::Config;
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use settings_db::SettingsDb;
