//! HTML message bodies sent to chats

use slotwatch_core::{Campaign, RewardResult};
use slotwatch_engine::RewardListing;
use std::fmt::Write;

/// Escape text for Telegram's HTML parse mode, which only knows `&lt;`, `&gt;` and `&amp;`
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn link(url: &str, label: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape_html(url), escape_html(label))
}

pub fn reward_available(result: &RewardResult, campaign: &Campaign, base_url: &str) -> String {
    let Some(reward) = result.reward.as_ref() else {
        return format!("Reward {} is available", result.id);
    };

    let mut text = format!(
        "🎉 <b>Reward available!</b>\n\n{} ({}) from {}",
        link(&reward.checkout_url(base_url), reward.title()),
        escape_html(&reward.formatted_amount()),
        link(campaign.url(), campaign.name()),
    );
    if reward.attributes.remaining > 0 {
        let _ = write!(text, "\nRemaining slots: {}", reward.attributes.remaining);
    }
    text
}

pub fn rewards_missing(missing: &[RewardResult]) -> String {
    let mut text = String::from("⚠️ <b>The following rewards could not be checked:</b>\n");
    for result in missing {
        let _ = write!(
            text,
            "\n• <code>{}</code>: {}",
            result.id,
            escape_html(result.status.reason())
        );
        if let Some(reward) = result.reward.as_ref().filter(|r| !r.title().is_empty()) {
            let _ = write!(text, " ({})", escape_html(reward.title()));
        }
    }
    text
}

pub fn reward_list(listing: &RewardListing, base_url: &str) -> String {
    if listing.campaigns.is_empty() {
        return "You are not tracking any available rewards yet. Add some with /add".to_string();
    }

    let mut text = String::from("<b>Tracked rewards</b>\n");
    for entry in &listing.campaigns {
        let _ = write!(
            text,
            "\n{}\n",
            link(entry.campaign.url(), entry.campaign.name())
        );
        for reward in &entry.rewards {
            let _ = writeln!(
                text,
                "• <code>{}</code> {} ({}, {} left)",
                reward.id,
                link(&reward.checkout_url(base_url), reward.title()),
                escape_html(&reward.formatted_amount()),
                reward.attributes.remaining
            );
        }
    }
    text
}

pub fn privacy_policy(chat_id: i64) -> String {
    format!(
        "This bot saves the following user information:\n\n\
         1. Your Chat ID (to identify you and match your data to your Telegram account)\n\
         \u{20}  - In your case, this would be <code>{}</code>\n\n\
         2. Your provided user information:\n\
         \u{20}  - Language\n\n\
         3. Your tracked rewards (their IDs)\n\
         \u{20}  - These are periodically checked to see whether new slots are available\n\
         \u{20}  - This can be linked to the campaign and the creator they are associated with",
        chat_id
    )
}
