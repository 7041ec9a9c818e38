use crate::app::InputLayer;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    Left,
    Right,
    ToggleChoice,
    Submit,
    Cancel,
    Backspace,
    InputChar(char),
    FocusMenu,
    FocusContent,
    OpenContextPicker,
    OpenNamespacePicker,
    ToggleSearch,
    OpenTimeframe,
    StartPodFilter,
    ShowLogs,
    ShowYaml,
    DeletePod,
    RestartPod,
    ToggleFollow,
    Refresh,
}

pub fn map_key(layer: InputLayer, key: KeyEvent) -> Option<Action> {
    if is_quit_chord(key) {
        return Some(Action::Quit);
    }

    match layer {
        InputLayer::Fatal => None,
        InputLayer::ContextPicker
        | InputLayer::NamespacePicker
        | InputLayer::TimeframeInput
        | InputLayer::PodFilter => map_text_key(key),
        InputLayer::MenuSearch => match key.code {
            KeyCode::Char('/') if plain(key) => Some(Action::ToggleSearch),
            KeyCode::Char('1') if plain(key) => Some(Action::FocusMenu),
            KeyCode::Char('2') if plain(key) => Some(Action::FocusContent),
            _ => map_text_key(key),
        },
        InputLayer::Confirmation => map_confirmation_key(key),
        InputLayer::Logs => map_viewer_key(key, true),
        InputLayer::Yaml => map_viewer_key(key, false),
        InputLayer::Menu => map_normal_key(key, false),
        InputLayer::Content => map_normal_key(key, true),
    }
}

fn is_quit_chord(key: KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
}

fn plain(key: KeyEvent) -> bool {
    !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

fn map_text_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Up => Some(Action::Up),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) if plain(key) => Some(Action::InputChar(c)),
        _ => None,
    }
}

fn map_confirmation_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Left => Some(Action::Left),
        KeyCode::Char('h') if plain(key) => Some(Action::Left),
        KeyCode::Right => Some(Action::Right),
        KeyCode::Char('l') if plain(key) => Some(Action::Right),
        KeyCode::Tab | KeyCode::BackTab => Some(Action::ToggleChoice),
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Esc => Some(Action::Cancel),
        _ => None,
    }
}

fn map_viewer_key(key: KeyEvent, follows: bool) -> Option<Action> {
    match key.code {
        KeyCode::Up => Some(Action::Up),
        KeyCode::Char('k') if plain(key) => Some(Action::Up),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('j') if plain(key) => Some(Action::Down),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::Home => Some(Action::Top),
        KeyCode::Char('g') if plain(key) => Some(Action::Top),
        KeyCode::End => Some(Action::Bottom),
        KeyCode::Char('G') => Some(Action::Bottom),
        KeyCode::Char('f') if follows && plain(key) => Some(Action::ToggleFollow),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Char('q') if plain(key) => Some(Action::Cancel),
        _ => None,
    }
}

fn map_normal_key(key: KeyEvent, content_focused: bool) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('n') if ctrl => Some(Action::OpenNamespacePicker),
        KeyCode::Char('k') if ctrl => Some(Action::OpenContextPicker),
        KeyCode::Char('r') if ctrl => Some(Action::Refresh),
        KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Char('q') if plain(key) => Some(Action::Quit),
        KeyCode::Char('1') if plain(key) => Some(Action::FocusMenu),
        KeyCode::Char('2') if plain(key) => Some(Action::FocusContent),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Char('k') if plain(key) => Some(Action::Up),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('j') if plain(key) => Some(Action::Down),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Char('/') if plain(key) && content_focused => Some(Action::StartPodFilter),
        KeyCode::Char('/') if plain(key) => Some(Action::ToggleSearch),
        KeyCode::Char('t') if plain(key) && content_focused => Some(Action::OpenTimeframe),
        KeyCode::Char('l') if plain(key) && content_focused => Some(Action::ShowLogs),
        KeyCode::Char('y') if plain(key) && content_focused => Some(Action::ShowYaml),
        KeyCode::Char('d') if plain(key) && content_focused => Some(Action::DeletePod),
        KeyCode::Char('r') if plain(key) && content_focused => Some(Action::RestartPod),
        _ => None,
    }
}
