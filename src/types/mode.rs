/// How the gadget is currently exposing partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    /// Served read-only to the external host; edits need a quick-edit transition.
    Present,
    /// Gadget unbound and partitions mounted read-write locally; edits go direct.
    Edit,
    Unknown,
}

impl PresentMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Edit => "edit",
            Self::Unknown => "unknown",
        }
    }
}
