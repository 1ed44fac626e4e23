//! Keyboard construction.
//!
//! Reply keyboards drive the metric screens; inline keyboards drive the
//! container flows. The button labels double as dispatch triggers, so the
//! label fragments here must stay in sync with the handler registry.

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};

/// The main reply keyboard.
#[must_use]
pub fn main_keyboard() -> KeyboardMarkup {
    let rows = vec![
        vec![
            KeyboardButton::new("🪫 Load average"),
            KeyboardButton::new("📟 Memory load"),
            KeyboardButton::new("⏱ Sensors"),
        ],
        vec![
            KeyboardButton::new("🚀 Process"),
            KeyboardButton::new("🛸 Uptime"),
            KeyboardButton::new("💾 File system"),
        ],
        vec![
            KeyboardButton::new("🐳 Docker"),
            KeyboardButton::new("📡 Network"),
            KeyboardButton::new("🐢 About me"),
        ],
    ];
    resized(rows)
}

/// The Docker submenu keyboard.
#[must_use]
pub fn docker_keyboard() -> KeyboardMarkup {
    let rows = vec![
        vec![
            KeyboardButton::new("🧳 Containers"),
            KeyboardButton::new("🖼 Images"),
        ],
        vec![KeyboardButton::new("🔙 Back to main menu")],
    ];
    resized(rows)
}

/// The authentication keyboard offered to admins at the auth gate.
#[must_use]
pub fn auth_keyboard() -> KeyboardMarkup {
    let rows = vec![
        vec![
            KeyboardButton::new("🔐 Enter 2FA code"),
            KeyboardButton::new("📱 Get QR-code for 2FA app"),
        ],
        vec![KeyboardButton::new("🔙 Back to main menu")],
    ];
    resized(rows)
}

/// One inline button per container, callback `__get_full__:<name>:<uid>`.
#[must_use]
pub fn containers_keyboard(names: &[String], user_id: u64) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = names
        .iter()
        .map(|name| {
            InlineKeyboardButton::callback(
                name.to_uppercase(),
                format!("__get_full__:{name}:{user_id}"),
            )
        })
        .collect();
    InlineKeyboardMarkup::new(chunk(buttons, 2))
}

/// Detail-screen keyboard: logs, optional manage, back.
#[must_use]
pub fn container_detail_keyboard(
    name: &str,
    user_id: u64,
    include_manage: bool,
) -> InlineKeyboardMarkup {
    let mut buttons = vec![InlineKeyboardButton::callback(
        "Get logs",
        format!("__get_logs__:{name}:{user_id}"),
    )];
    if include_manage {
        buttons.push(InlineKeyboardButton::callback(
            "Manage",
            format!("__manage__:{name}:{user_id}"),
        ));
    }
    buttons.push(InlineKeyboardButton::callback(
        "Back to all containers",
        "back_to_containers",
    ));
    InlineKeyboardMarkup::new(chunk(buttons, 2))
}

/// Single back button used by the logs screen.
#[must_use]
pub fn back_to_containers_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "Back to all containers",
        "back_to_containers",
    )]])
}

/// Manage-menu keyboard. The four mutating actions carry signed payloads
/// produced by the caller; this builder only lays them out.
#[must_use]
pub fn manage_actions_keyboard(actions: Vec<(String, String)>) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = actions
        .into_iter()
        .map(|(label, data)| InlineKeyboardButton::callback(label, data))
        .collect();
    InlineKeyboardMarkup::new(chunk(buttons, 2))
}

/// Swap drill-down button on the memory screen.
#[must_use]
pub fn memory_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "Swap details",
        "__swap_info__",
    )]])
}

/// `How to update?` button on the release-check screen.
#[must_use]
pub fn update_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "How to update?",
        "__how_update__",
    )]])
}

/// The post-auth referer keyboard: one button reproducing the stored
/// trigger exactly.
#[must_use]
pub fn referer_keyboard(referer: &bosun_session::Referer) -> ResumeKeyboard {
    match referer.kind {
        bosun_session::RefererKind::CallbackQuery => {
            ResumeKeyboard::Inline(InlineKeyboardMarkup::new(vec![vec![
                InlineKeyboardButton::callback("Resume", referer.data.clone()),
            ]]))
        },
        bosun_session::RefererKind::Message => ResumeKeyboard::Reply(resized(vec![vec![
            KeyboardButton::new(referer.data.clone()),
        ]])),
    }
}

/// The two shapes a referer keyboard can take.
#[derive(Debug, Clone)]
pub enum ResumeKeyboard {
    /// Inline keyboard carrying the stored callback data.
    Inline(InlineKeyboardMarkup),
    /// Reply keyboard reproducing the stored message text.
    Reply(KeyboardMarkup),
}

fn resized(rows: Vec<Vec<KeyboardButton>>) -> KeyboardMarkup {
    let mut markup = KeyboardMarkup::new(rows);
    markup.resize_keyboard = true;
    markup
}

fn chunk(buttons: Vec<InlineKeyboardButton>, per_row: usize) -> Vec<Vec<InlineKeyboardButton>> {
    buttons
        .chunks(per_row.max(1))
        .map(<[InlineKeyboardButton]>::to_vec)
        .collect()
}
