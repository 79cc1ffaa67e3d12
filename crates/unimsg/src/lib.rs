//! # UniMsg
//!
//! One message model for every chat platform, and declarative commands that
//! match against it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  BuilderTable  ┌────────────┐  Alconna   ┌──────────┐
//! │ wire message │───────────────▶│ UniMessage │───────────▶│ Arparma  │──▶ handler
//! └──────────────┘                └─────┬──────┘            └──────────┘
//!        ▲                              │
//!        └────────── Exporter ◀─────────┘  (replies, prompts, help text)
//! ```
//!
//! - **core**: segments, [`UniMessage`](core::UniMessage), templates, dump/load,
//!   builder and exporter tables
//! - **alconna**: command grammars, the matching engine, interactive
//!   completion and the tower layer
//! - **runtime**: configuration loading and logging setup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use unimsg::prelude::*;
//!
//! let config = ConfigLoader::new().load()?;
//! let _guard = init_from_config(&config.logging);
//!
//! let weather = Alconna::declare("weather <city:str> [days:int=1]")?
//!     .prefix("/")
//!     .build()?;
//!
//! let service = on_alconna(Arc::new(weather))
//!     .config(config.command.clone())
//!     .service(service_fn(|req: CommandMatch<MyEvent>| async move {
//!         let city = req.result.query("city");
//!         Ok::<_, BoxError>(())
//!     }));
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: `unimsg.toml` configuration files
//! - `yaml-config`: `unimsg.yaml` configuration files
//! - `json-log`: JSON log format
//! - `adapter-onebot`: the OneBot v11 builder and exporter

pub use unimsg_alconna as alconna;
pub use unimsg_core as core;
pub use unimsg_runtime as runtime;

#[cfg(feature = "adapter-onebot")]
pub use unimsg_adapter_onebot as onebot;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use unimsg::prelude::*;
/// ```
pub mod prelude {
    // Message model
    pub use unimsg_core::{
        DumpOptions, FallbackPolicy, Segment, SegmentKind, Target, Template, UniMessage,
    };

    // Platform bridges
    pub use unimsg_core::{BuilderTable, Exporter, NativeSegment, Sender};

    // Command grammar and results
    pub use unimsg_alconna::{
        Action, Alconna, Arg, ArgValue, Arparma, CommandMeta, CommandRegistry, ErrorKind,
        Namespace, Opt, Pattern, Subcommand,
    };

    // Tower integration and sessions
    pub use unimsg_alconna::{
        CommandEvent, CommandMatch, Conversation, EventSkipped, SessionLocks, on_alconna,
    };

    // Configuration and logging
    pub use unimsg_runtime::{ConfigLoader, UniConfig, init_from_config};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_round_trip() {
        let grammar = Alconna::declare("echo <words:str>")
            .unwrap()
            .prefix("/")
            .build()
            .unwrap();
        let result = grammar.parse(&UniMessage::new().text("/echo hi"));
        assert!(result.matched);
        assert_eq!(result.get("words"), Some(&ArgValue::from("hi")));
        assert!(UniConfig::default().command.strict);
    }
}
