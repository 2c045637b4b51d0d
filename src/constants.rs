// src/constants.rs

/// Parameter names that denote the receiver of a method and are never exposed.
pub const RECEIVER_NAMES: &[&str] = &["self", "cls"];

/// Parsed-value keys consumed by the runner and stripped before invocation.
pub const RESERVED_KEYS: &[&str] = &[
    "notraceback",
    "raw",
    "timing",
    "cli",
    "pdb",
    "debugger",
    "command",
];

/// Flag names of the meta options every generated parser carries.
pub const META_FLAGS: &[&str] = &["notraceback", "raw", "timing", "cli"];

/// Help heading the meta options are listed under.
pub const META_HEADING: &str = "OPTIONAL CLI ARGUMENTS";

/// Short flag reserved for help on every parser.
pub const HELP_SHORT_FLAG: char = 'h';

/// Prefix given to the flag of a boolean parameter that defaults to true.
pub const INVERTED_PREFIX: &str = "no_";

/// Suffix wrapper enums are registered under in the lookup table.
pub const WRAPPER_VALUE_SUFFIX: &str = "Value";

/// Trailing path segment an external enum wrapper exposes its values under.
pub const WRAPPER_VALUE_SEGMENT: &str = "V";

/// Exit status used when no command has been registered.
pub const EXIT_NO_COMMANDS: i32 = 3;

/// Exit status used for a failed invocation.
pub const EXIT_FAILURE: i32 = 1;

/// Environment variable selecting the flag name style (`kebab` or `snake`).
pub const ENV_NAME_STYLE: &str = "CLIFORM_NAME_STYLE";

/// Environment variable that makes failed invocations print a single line.
pub const ENV_NOTRACEBACK: &str = "CLIFORM_NOTRACEBACK";

/// Default name of the optional configuration file.
pub const CONFIG_FILENAME: &str = "cliform.toml";
