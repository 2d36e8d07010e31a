#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose whole remainder is one free-text argument.
pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "mode",
        action: "select_mode",
    },
    CommandSpec {
        command: "ratio",
        action: "set_aspect_ratio",
    },
    CommandSpec {
        command: "analyze",
        action: "analyze",
    },
    CommandSpec {
        command: "edit",
        action: "edit",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "image",
        action: "set_image",
    },
    CommandSpec {
        command: "save",
        action: "save",
    },
    CommandSpec {
        command: "speak",
        action: "speak",
    },
];

/// `<token> [endpoint]`
pub(crate) const CREDENTIAL_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "login",
        action: "login",
    },
    CommandSpec {
        command: "switch",
        action: "switch_credential",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "modes",
        action: "list_modes",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "connect",
        action: "connect_host",
    },
    CommandSpec {
        command: "logout",
        action: "logout",
    },
    CommandSpec {
        command: "show",
        action: "show_result",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/mode <id>",
    "/modes",
    "/ratio <1:1|3:4|4:3|16:9|9:16>",
    "/image <path>",
    "/analyze [instruction]",
    "/edit <instruction>",
    "/save <path>",
    "/speak [path]",
    "/show",
    "/login <key> [endpoint]",
    "/switch <key> [endpoint]",
    "/logout",
    "/connect",
    "/status",
    "/help",
    "/quit",
];
