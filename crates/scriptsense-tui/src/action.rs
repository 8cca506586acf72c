/// Actions that the TUI can process, mapped from keyboard input or internal events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    CancelJob,
    SwitchPanel,
    BeginEdit,
    CancelEdit,
    CommitEdit,
    Input(char),
    Backspace,
    ExportPdf,
    ExportDoc,
    ToggleWhitespace,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    ToggleHelp,
    Tick,
    Resize(u16, u16),
    None,
}
