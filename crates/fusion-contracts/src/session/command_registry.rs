#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Browse-style selection bound to a fixed slot: `/person1 PATH`.
pub(crate) const SLOT_SELECT_COMMANDS: &[(CommandSpec, &str)] = &[
    (
        CommandSpec {
            command: "person1",
            action: "select",
        },
        "1",
    ),
    (
        CommandSpec {
            command: "person2",
            action: "select",
        },
        "2",
    ),
];

/// Commands taking a slot followed by a path: `/drop 2 PATH`.
pub(crate) const SLOT_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "select",
        action: "select",
    },
    CommandSpec {
        command: "drop",
        action: "drop",
    },
];

pub(crate) const SLOT_ONLY_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "clear",
    action: "clear",
}];

pub(crate) const OPTIONAL_ARG_COMMANDS: &[(CommandSpec, &str)] = &[
    (
        CommandSpec {
            command: "theme",
            action: "set_theme",
        },
        "theme",
    ),
    (
        CommandSpec {
            command: "download",
            action: "download",
        },
        "dir",
    ),
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "abandon",
        action: "abandon",
    },
    CommandSpec {
        command: "themes",
        action: "list_themes",
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

pub const SESSION_HELP_COMMANDS: &[&str] = &[
    "/person1 PATH",
    "/person2 PATH",
    "/select 1|2 PATH",
    "/drop 1|2 PATH",
    "/clear 1|2",
    "/generate",
    "/status",
    "/abandon",
    "/download [DIR]",
    "/theme [NAME]",
    "/themes",
    "/help",
    "/quit",
];
