//! Screen rendering.
//!
//! Every user-visible text is produced here, in HTML parse mode with all
//! interpolated values escaped. Handlers never build message bodies inline.

use std::fmt::Write as _;

use bosun_docker::{ContainerFullStats, ContainerSummary, DockerCounters, ImageRecord};
use bosun_system::{
    DiskSnapshot, LoadAverage, MemorySnapshot, NetworkSnapshot, ProcessCounts, SensorReading,
    SwapSnapshot,
};

/// Escape text for HTML parse mode.
#[must_use]
pub fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ---------------------------------------------------------------------------
// General screens
// ---------------------------------------------------------------------------

/// `/start` welcome.
#[must_use]
pub fn welcome(first_name: &str) -> String {
    format!(
        "🐳 Hello, {}!\n\
         I keep an eye on this host and its containers for you.\n\n\
         Pick something from the keyboard below, or send /help.",
        html_escape(first_name),
    )
}

/// `/help`.
#[must_use]
pub fn help() -> String {
    "<b>bosun</b> — operations agent for this host\n\n\
     <b>Commands:</b>\n\
     /start — welcome and main keyboard\n\
     /help — this text\n\
     /back — back to the main menu\n\
     /docker — Docker overview\n\
     /containers — list containers\n\
     /images — list images\n\
     /qrcode — 2FA enrolment QR code (admins)\n\
     /check_bot_updates — check for a newer release\n\n\
     The keyboard buttons cover live host metrics; container management \
     needs a two-factor login with <i>Enter 2FA code</i>."
        .to_owned()
}

/// `About me`.
#[must_use]
pub fn about() -> String {
    format!(
        "<b>bosun</b> v{}\n\
         Telegram operations agent for a Docker host.\n\
         Source: {}",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_REPOSITORY"),
    )
}

/// Fallback echo for anything unmatched.
#[must_use]
pub fn echo() -> String {
    "I don't know what to do with that 🤷\nTry /help for what I understand.".to_owned()
}

/// Generic error reply; never carries internal detail.
#[must_use]
pub fn internal_error() -> String {
    "Something went wrong on my side. The error is logged; please try again.".to_owned()
}

// ---------------------------------------------------------------------------
// Access control / rate limit
// ---------------------------------------------------------------------------

/// First refusal for a non-allow-listed sender.
#[must_use]
pub fn access_refused_terse() -> String {
    "Sorry, you don't have the rights to access this bot...(".to_owned()
}

/// Second-and-later refusal.
#[must_use]
pub fn access_refused_final() -> String {
    "This bot is private and your id is not on its allow-list.\n\
     Further messages will be ignored for a while. Goodbye."
        .to_owned()
}

/// Rate limit reply.
#[must_use]
pub fn slow_down() -> String {
    "You're sending messages too fast. Slow down a little and try again.".to_owned()
}

// ---------------------------------------------------------------------------
// Authentication screens
// ---------------------------------------------------------------------------

/// Prompt shown after `Enter 2FA code`.
#[must_use]
pub fn totp_prompt() -> String {
    "🔐 Send me the 6-digit code from your authenticator app.\n\
     You can also send it as a command, e.g. <code>/123456</code>."
        .to_owned()
}

/// Invalid code, retry allowed.
#[must_use]
pub fn totp_invalid() -> String {
    "Invalid TOTP code. Please try again.".to_owned()
}

/// Attempt budget exhausted.
#[must_use]
pub fn totp_blocked(minutes: i64) -> String {
    format!(
        "Maximum attempts reached. Code entry is blocked for {minutes} minutes."
    )
}

/// Successful verification.
#[must_use]
pub fn totp_success() -> String {
    "✅ Code accepted — you are authenticated for the next 5 minutes.".to_owned()
}

/// Successful verification with a stored referer to resume.
#[must_use]
pub fn totp_success_with_referer() -> String {
    format!(
        "{}\nYou can now resume what you were doing:",
        totp_success()
    )
}

/// Denial for privileged handlers, admin not yet authenticated.
#[must_use]
pub fn auth_required() -> String {
    "🔐 This action needs two-factor authentication.\n\
     Use <i>Enter 2FA code</i> to log in; I'll bring you back here afterwards."
        .to_owned()
}

/// Denial for callers who are not admins at all.
#[must_use]
pub fn access_denied() -> String {
    "Access denied.".to_owned()
}

/// Caption for the enrolment QR code.
#[must_use]
pub fn qr_caption() -> String {
    "Scan this in your authenticator app. The picture self-destructs in 60 seconds."
        .to_owned()
}

/// Sent when the QR message could not be deleted.
#[must_use]
pub fn qr_delete_failed() -> String {
    "I could not delete the QR code message — please delete it manually.".to_owned()
}

/// Told to non-admins asking for 2FA features.
#[must_use]
pub fn qr_not_admin() -> String {
    "Two-factor enrolment is only available to admins.".to_owned()
}

// ---------------------------------------------------------------------------
// System screens
// ---------------------------------------------------------------------------

/// `Load average`.
#[must_use]
pub fn load_average(load: &LoadAverage) -> String {
    format!(
        "🪫 <b>Load average</b>\n\n\
         1 min: <code>{:.2}</code>\n\
         5 min: <code>{:.2}</code>\n\
         15 min: <code>{:.2}</code>",
        load.one, load.five, load.fifteen,
    )
}

/// `Memory load`.
#[must_use]
pub fn memory(memory: &MemorySnapshot) -> String {
    format!(
        "📟 <b>Memory load</b>\n\n\
         Total: <code>{}</code>\n\
         Available: <code>{}</code>\n\
         Used: <code>{}</code> ({:.2}%)\n\
         Free: <code>{}</code>",
        memory.total, memory.available, memory.used, memory.percent, memory.free,
    )
}

/// `__swap_info__` drill-down.
#[must_use]
pub fn swap(swap: &SwapSnapshot) -> String {
    format!(
        "💱 <b>Swap</b>\n\n\
         Total: <code>{}</code>\n\
         Used: <code>{}</code> ({:.2}%)\n\
         Free: <code>{}</code>",
        swap.total, swap.used, swap.percent, swap.free,
    )
}

/// `Sensors`.
#[must_use]
pub fn sensors(readings: &[SensorReading]) -> String {
    if readings.is_empty() {
        return "⏱ <b>Sensors</b>\n\nThis host exposes no temperature sensors.".to_owned();
    }
    let mut text = String::from("⏱ <b>Sensors</b>\n\n");
    for reading in readings {
        match reading.degrees {
            Some(degrees) => {
                let _ = writeln!(
                    text,
                    "{}: <code>{degrees:.1}°C</code>",
                    html_escape(&reading.label)
                );
            },
            None => {
                let _ = writeln!(text, "{}: no reading", html_escape(&reading.label));
            },
        }
    }
    text
}

/// `Process`.
#[must_use]
pub fn processes(counts: &ProcessCounts) -> String {
    format!(
        "🚀 <b>Processes</b>\n\n\
         Running: <code>{}</code>\n\
         Sleeping: <code>{}</code>\n\
         Idle: <code>{}</code>\n\
         Total: <code>{}</code>",
        counts.running, counts.sleeping, counts.idle, counts.total,
    )
}

/// `Uptime`.
#[must_use]
pub fn uptime(uptime: &str) -> String {
    format!("🛸 <b>Uptime</b>\n\n<code>{}</code>", html_escape(uptime))
}

/// `File system`.
#[must_use]
pub fn file_systems(disks: &[DiskSnapshot]) -> String {
    if disks.is_empty() {
        return "💾 <b>File system</b>\n\nNo mounted file systems visible.".to_owned();
    }
    let mut text = String::from("💾 <b>File system</b>\n");
    for disk in disks {
        let _ = write!(
            text,
            "\n<b>{}</b> ({}) on {}\n\
             Size: <code>{}</code>, used: <code>{}</code> ({:.2}%), free: <code>{}</code>\n",
            html_escape(&disk.device),
            html_escape(&disk.fs_type),
            html_escape(&disk.mount_point),
            disk.size,
            disk.used,
            disk.percent,
            disk.free,
        );
    }
    text
}

/// `Network`.
#[must_use]
pub fn network(interfaces: &[NetworkSnapshot]) -> String {
    if interfaces.is_empty() {
        return "📡 <b>Network</b>\n\nNo interfaces visible.".to_owned();
    }
    let mut text = String::from("📡 <b>Network</b>\n");
    for net in interfaces {
        let _ = write!(
            text,
            "\n<b>{}</b>\n\
             Sent: <code>{}</code> ({} packets, {} errors)\n\
             Received: <code>{}</code> ({} packets, {} errors)\n",
            html_escape(&net.interface),
            net.bytes_sent,
            net.packets_sent,
            net.errors_out,
            net.bytes_received,
            net.packets_received,
            net.errors_in,
        );
    }
    text
}

// ---------------------------------------------------------------------------
// Docker screens
// ---------------------------------------------------------------------------

/// `/docker` overview.
#[must_use]
pub fn docker_overview(counters: &DockerCounters) -> String {
    format!(
        "🐳 <b>Docker</b>\n\n\
         Images: <code>{}</code>\n\
         Running containers: <code>{}</code>",
        counters.images_count, counters.containers_count,
    )
}

/// Shown when the engine is unreachable.
#[must_use]
pub fn docker_unavailable() -> String {
    "🐳 The container engine is not reachable right now.".to_owned()
}

/// Containers listing.
#[must_use]
pub fn containers(summaries: &[ContainerSummary]) -> String {
    if summaries.is_empty() {
        return "🧳 <b>Containers</b>\n\nNo containers on this host.".to_owned();
    }
    let mut text = String::from("🧳 <b>Containers</b>\n");
    for summary in summaries {
        let _ = write!(
            text,
            "\n<b>{}</b> (<code>{}</code>)\n\
             Image: {}\n\
             Created: {}\n\
             Started: {}\n\
             Status: {}\n",
            html_escape(&summary.name),
            html_escape(&summary.short_id),
            html_escape(&summary.image),
            html_escape(&summary.created),
            html_escape(&summary.run_at),
            html_escape(&summary.status),
        );
    }
    text.push_str("\nTap a container for details 👇");
    text
}

/// Full container details.
#[must_use]
pub fn container_full(name: &str, stats: &ContainerFullStats) -> String {
    let attrs = &stats.attrs;
    let mut text = format!(
        "💭 <b>{}</b>\n\n\
         <b>Memory</b>\n\
         Usage: <code>{}</code> of <code>{}</code> ({:.2}%)\n\n\
         <b>CPU throttling</b>\n\
         Periods: <code>{}</code>, throttled: <code>{}</code>\n\n\
         <b>Network (eth0)</b>\n\
         RX: <code>{}</code> (dropped {}, errors {})\n\
         TX: <code>{}</code> (dropped {}, errors {})\n\n\
         <b>State</b>\n\
         Running: {}, paused: {}, restarting: {}, dead: {}\n\
         Restarts: {}",
        html_escape(name),
        stats.memory.usage,
        stats.memory.limit,
        stats.memory.percent,
        stats.cpu.periods,
        stats.cpu.throttled_periods,
        stats.network.rx_bytes,
        stats.network.rx_dropped,
        stats.network.rx_errors,
        stats.network.tx_bytes,
        stats.network.tx_dropped,
        stats.network.tx_errors,
        attrs.running,
        attrs.paused,
        attrs.restarting,
        attrs.dead,
        attrs.restart_count,
    );
    if let Some(code) = attrs.exit_code {
        let _ = write!(text, ", exit code: {code}");
    }
    if !attrs.cmd.is_empty() {
        let _ = write!(
            text,
            "\nCmd: <code>{}</code>",
            html_escape(&attrs.cmd.join(" "))
        );
    }
    if !attrs.args.is_empty() {
        let _ = write!(
            text,
            "\nArgs: <code>{}</code>",
            html_escape(&attrs.args.join(" "))
        );
    }
    if !attrs.env.is_empty() {
        let _ = write!(text, "\nEnv entries: {}", attrs.env.len());
    }
    text
}

/// Container logs screen.
#[must_use]
pub fn container_logs(name: &str, logs: &str) -> String {
    format!(
        "💭 <b>Logs — {}</b>\n\n<pre>{}</pre>",
        html_escape(name),
        html_escape(logs),
    )
}

/// Manage menu header.
#[must_use]
pub fn manage_menu(name: &str) -> String {
    format!(
        "💭 <b>Managing {}</b>\n\nPick an action. Every action is logged.",
        html_escape(name),
    )
}

/// Prompt for the new name of a container being renamed.
#[must_use]
pub fn rename_prompt(name: &str) -> String {
    format!(
        "Send the new name for <b>{}</b> (1–64 characters).",
        html_escape(name),
    )
}

/// Images listing.
#[must_use]
pub fn images(records: &[ImageRecord]) -> String {
    if records.is_empty() {
        return "🖼 <b>Images</b>\n\nNo images on this host.".to_owned();
    }
    let mut text = String::from("🖼 <b>Images</b>\n");
    for record in records {
        let _ = write!(
            text,
            "\n<b>{}</b> (<code>{}</code>)\n\
             Size: {}, created: {}\n\
             Arch: {}, OS: {}\n",
            html_escape(&record.name),
            html_escape(&record.short_id),
            record.size,
            html_escape(&record.created),
            html_escape(&record.architecture),
            html_escape(&record.os),
        );
        if !record.author.is_empty() {
            let _ = writeln!(text, "Author: {}", html_escape(&record.author));
        }
        if !record.exposed_ports.is_empty() {
            let _ = writeln!(
                text,
                "Ports: {}",
                html_escape(&record.exposed_ports.join(", "))
            );
        }
        if !record.entrypoint.is_empty() {
            let _ = writeln!(
                text,
                "Entrypoint: <code>{}</code>",
                html_escape(&record.entrypoint.join(" "))
            );
        }
        if !record.cmd.is_empty() {
            let _ = writeln!(
                text,
                "Cmd: <code>{}</code>",
                html_escape(&record.cmd.join(" "))
            );
        }
    }
    text
}

// ---------------------------------------------------------------------------
// Release check
// ---------------------------------------------------------------------------

/// Running the latest release.
#[must_use]
pub fn update_in_date(version: &str) -> String {
    format!(
        "✅ You are running the latest release (v{}).",
        html_escape(version)
    )
}

/// A newer release exists.
#[must_use]
pub fn update_available(current: &str, latest: &str) -> String {
    format!(
        "🆕 Release <b>v{}</b> is available; you are on v{}.",
        html_escape(latest),
        html_escape(current),
    )
}

/// Running ahead of the newest published release.
#[must_use]
pub fn update_ahead(current: &str, latest: &str) -> String {
    format!(
        "🧪 You are running v{}, ahead of the newest published release v{}. \
         Development build?",
        html_escape(current),
        html_escape(latest),
    )
}

/// The check itself failed.
#[must_use]
pub fn update_check_failed() -> String {
    "Could not reach the release feed. Try again later.".to_owned()
}

/// `__how_update__` instructions.
#[must_use]
pub fn how_to_update() -> String {
    "Pull the new image and recreate the container:\n\
     <code>docker pull bosunops/bosun:latest</code>\n\
     <code>docker compose up -d bosun</code>"
        .to_owned()
}
