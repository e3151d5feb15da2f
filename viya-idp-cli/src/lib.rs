//! # viya-idp-cli
//!
//! Operator tooling for `viya-idp` configuration files.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `viya-idp check` | Load and validate a configuration, print a summary |
//! | `viya-idp hash <secret>` | Hash a secret for use in a configuration file |
//! | `viya-idp authorize <client>` | Dry-run a grant request against a client |
//! | `viya-idp claims <username>` | Show the claims released for a set of scopes |
//!
//! Every command except `hash` reads the file given with `--config`, or the
//! built-in sample tenant when none is given.

pub mod commands;
