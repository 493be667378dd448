use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Which screen keyboard input goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    AddUrl,
    ConfirmDelete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Quit,

    // Playback
    TogglePlayPause,
    NextTrack,
    PreviousTrack,
    SeekForward,
    SeekBackward,

    // Playlist
    OpenAddUrl,
    RequestDelete,
    ClearPlaylist,

    // URL dialog
    Input(char),
    Backspace,
    SubmitUrl,
    CancelUrl,

    // Delete dialog
    ConfirmDelete,
    CancelDelete,
}

pub fn key_to_app_event(mode: InputMode, key: KeyEvent) -> Option<AppEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match mode {
        InputMode::Normal => normal_key(key),
        InputMode::AddUrl => url_input_key(key),
        InputMode::ConfirmDelete => confirm_key(key),
    }
}

fn normal_key(key: KeyEvent) -> Option<AppEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(AppEvent::Quit);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Quit),

        KeyCode::Char(' ') => Some(AppEvent::TogglePlayPause),
        KeyCode::Char('n') => Some(AppEvent::NextTrack),
        KeyCode::Char('p') => Some(AppEvent::PreviousTrack),
        KeyCode::Right => Some(AppEvent::SeekForward),
        KeyCode::Left => Some(AppEvent::SeekBackward),

        KeyCode::Char('a') => Some(AppEvent::OpenAddUrl),
        KeyCode::Char('d') => Some(AppEvent::RequestDelete),
        KeyCode::Char('c') => Some(AppEvent::ClearPlaylist),

        _ => None,
    }
}

fn url_input_key(key: KeyEvent) -> Option<AppEvent> {
    match key.code {
        KeyCode::Enter => Some(AppEvent::SubmitUrl),
        KeyCode::Esc => Some(AppEvent::CancelUrl),
        KeyCode::Backspace => Some(AppEvent::Backspace),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => Some(AppEvent::Input(c)),
        _ => None,
    }
}

fn confirm_key(key: KeyEvent) -> Option<AppEvent> {
    match key.code {
        KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => Some(AppEvent::ConfirmDelete),
        KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => Some(AppEvent::CancelDelete),
        _ => None,
    }
}
