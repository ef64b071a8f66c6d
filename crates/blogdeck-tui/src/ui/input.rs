//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes. Network calls are awaited inline, so a form
//! can't be submitted twice while its request is in flight.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{
    can_add_char, App, AppState, EditorFocus, LoginFocus, Page, SignUpFocus, MAX_EMAIL_LENGTH,
    MAX_PASSWORD_LENGTH, MAX_TITLE_LENGTH, PAGE_SCROLL_SIZE,
};

/// Maximum length for a username at sign-up
const MAX_USERNAME_LENGTH: usize = 50;

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::LoggingIn => return handle_login_input(app, key).await,
        AppState::SigningUp => return handle_signup_input(app, key).await,
        AppState::Commenting => return handle_comment_input(app, key).await,
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingDelete => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    app.delete_current_article().await;
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::Quitting => return Ok(true),
        AppState::Normal => {}
    }

    // The editor captures every printable key
    if app.page == Page::Editor {
        handle_editor_input(app, key).await;
        return Ok(false);
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return Ok(false);
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return Ok(false);
        }
        KeyCode::Char('l') => {
            if !app.session.is_authenticated() {
                app.start_login();
            }
            return Ok(false);
        }
        KeyCode::Char('s') => {
            if !app.session.is_authenticated() {
                app.start_signup();
            }
            return Ok(false);
        }
        KeyCode::Char('L') => {
            if app.session.is_authenticated() {
                app.logout();
            }
            return Ok(false);
        }
        KeyCode::Char('n') => {
            app.start_new_article();
            return Ok(false);
        }
        _ => {}
    }

    match app.page {
        Page::Home => handle_home_input(app, key).await,
        Page::Article => handle_article_input(app, key).await,
        Page::Editor => {}
    }
    Ok(false)
}

async fn handle_home_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Home => app.article_selection = 0,
        KeyCode::End => app.article_selection = app.articles.len().saturating_sub(1),
        KeyCode::Enter => {
            if let Some(id) = app.selected_article_id() {
                app.open_article(id).await;
            }
        }
        KeyCode::Char('r') => {
            app.revalidate_in_background();
            app.load_articles().await;
            app.status_message = Some("Articles refreshed".to_string());
        }
        _ => {}
    }
}

async fn handle_article_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Backspace => app.close_article(),
        KeyCode::Up | KeyCode::Char('k') => {
            app.article_scroll = app.article_scroll.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.article_scroll = app.article_scroll.saturating_add(1);
        }
        KeyCode::PageUp => {
            app.article_scroll = app.article_scroll.saturating_sub(PAGE_SCROLL_SIZE);
        }
        KeyCode::PageDown => {
            app.article_scroll = app.article_scroll.saturating_add(PAGE_SCROLL_SIZE);
        }
        KeyCode::Char('r') => {
            if let Some(id) = app.current_article.as_ref().map(|a| a.id) {
                app.open_article(id).await;
            }
        }
        KeyCode::Char('c') => app.start_comment(),
        KeyCode::Char('e') => app.start_edit_article().await,
        KeyCode::Char('d') => app.confirm_delete(),
        _ => {}
    }
}

async fn handle_editor_input(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.save_article().await;
        return;
    }

    match key.code {
        KeyCode::Esc => app.cancel_editor(),
        KeyCode::Tab => {
            app.editor_focus = match app.editor_focus {
                EditorFocus::Title => EditorFocus::Content,
                EditorFocus::Content => EditorFocus::Button,
                EditorFocus::Button => EditorFocus::Title,
            };
        }
        KeyCode::BackTab => {
            app.editor_focus = match app.editor_focus {
                EditorFocus::Title => EditorFocus::Button,
                EditorFocus::Content => EditorFocus::Title,
                EditorFocus::Button => EditorFocus::Content,
            };
        }
        KeyCode::Enter => match app.editor_focus {
            EditorFocus::Title => app.editor_focus = EditorFocus::Content,
            EditorFocus::Content => app.editor_content.push('\n'),
            EditorFocus::Button => app.save_article().await,
        },
        KeyCode::Backspace => match app.editor_focus {
            EditorFocus::Title => {
                app.editor_title.pop();
            }
            EditorFocus::Content => {
                app.editor_content.pop();
            }
            EditorFocus::Button => {}
        },
        KeyCode::Char(c) => match app.editor_focus {
            EditorFocus::Title => {
                if can_add_char(app.editor_title.chars().count(), MAX_TITLE_LENGTH, c) {
                    app.editor_title.push(c);
                }
            }
            EditorFocus::Content => {
                if !c.is_control() {
                    app.editor_content.push(c);
                }
            }
            EditorFocus::Button => {}
        },
        _ => {}
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.login_password.clear();
            app.login_error = None;
            app.state = AppState::Normal;
        }
        KeyCode::Down | KeyCode::Tab => {
            // Move to next field
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Email,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            // Move to previous field
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Email,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => {
                // On failure login_error is set and the form stays open
                let _ = app.attempt_login().await;
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_char(app.login_email.chars().count(), MAX_EMAIL_LENGTH, c) {
                    app.login_email.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_char(app.login_password.chars().count(), MAX_PASSWORD_LENGTH, c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {
                // Ignore character input on button
            }
        },
        _ => {}
    }
    Ok(false)
}

async fn handle_signup_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.signup_password.clear();
            app.signup_error = None;
            app.state = AppState::Normal;
        }
        KeyCode::Down | KeyCode::Tab => {
            app.signup_focus = match app.signup_focus {
                SignUpFocus::Username => SignUpFocus::Email,
                SignUpFocus::Email => SignUpFocus::Password,
                SignUpFocus::Password => SignUpFocus::Button,
                SignUpFocus::Button => SignUpFocus::Username,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.signup_focus = match app.signup_focus {
                SignUpFocus::Username => SignUpFocus::Button,
                SignUpFocus::Email => SignUpFocus::Username,
                SignUpFocus::Password => SignUpFocus::Email,
                SignUpFocus::Button => SignUpFocus::Password,
            };
        }
        KeyCode::Enter => match app.signup_focus {
            SignUpFocus::Username => app.signup_focus = SignUpFocus::Email,
            SignUpFocus::Email => app.signup_focus = SignUpFocus::Password,
            SignUpFocus::Password | SignUpFocus::Button => {
                let _ = app.attempt_signup().await;
            }
        },
        KeyCode::Backspace => {
            let field = match app.signup_focus {
                SignUpFocus::Username => &mut app.signup_username,
                SignUpFocus::Email => &mut app.signup_email,
                SignUpFocus::Password => &mut app.signup_password,
                SignUpFocus::Button => return Ok(false),
            };
            field.pop();
        }
        KeyCode::Char(c) => {
            let (field, max) = match app.signup_focus {
                SignUpFocus::Username => (&mut app.signup_username, MAX_USERNAME_LENGTH),
                SignUpFocus::Email => (&mut app.signup_email, MAX_EMAIL_LENGTH),
                SignUpFocus::Password => (&mut app.signup_password, MAX_PASSWORD_LENGTH),
                SignUpFocus::Button => return Ok(false),
            };
            if can_add_char(field.chars().count(), max, c) {
                field.push(c);
            }
        }
        _ => {}
    }
    Ok(false)
}

async fn handle_comment_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.comment_error = None;
            app.state = AppState::Normal;
        }
        KeyCode::Enter => app.submit_comment().await,
        KeyCode::Backspace => {
            app.comment_input.pop();
        }
        KeyCode::Char(c) => {
            if !c.is_control() {
                app.comment_input.push(c);
            }
        }
        _ => {}
    }
    Ok(false)
}
