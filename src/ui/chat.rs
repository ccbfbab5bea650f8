//! Chat panel fragment.
//!
//! The panel holds two parts: the feed (conversation, typing indicator and
//! quick prompts) and the input form. Submissions swap the whole panel
//! (`hx-swap="outerHTML"`). While a request is in flight the feed polls
//! itself and only the feed is replaced, so a draft typed in the meantime
//! survives. The poll response also carries an out-of-band send button so the
//! form unlocks as soon as the reply lands.

use std::fmt::Write as _;

use crate::markdown::{MarkdownRenderer, escape_html};
use crate::widget::{Message, QUICK_PROMPTS, Role, WidgetSnapshot, clock_label};

use super::icons;

/// DOM id of the swappable panel.
pub const PANEL_ID: &str = "chat-panel";

/// DOM id of the polled feed inside the panel.
pub const FEED_ID: &str = "chat-feed";

/// DOM id of the send button, replaced out of band by feed polls.
const SEND_BUTTON_ID: &str = "chat-send";

/// Delay between polls while a reply is pending.
const POLL_DELAY: &str = "700ms";

/// Render the full chat panel for `snapshot`.
pub fn chat_panel(snapshot: &WidgetSnapshot, renderer: &dyn MarkdownRenderer) -> String {
    format!(
        r#"<div id="{PANEL_ID}" class="flex-1 flex flex-col min-h-0" data-widget-id="{id}">
    {feed}
    {input}
</div>"#,
        id = escape_html(&snapshot.id),
        feed = chat_feed(snapshot, renderer),
        input = input_area(snapshot),
    )
}

/// Render the feed plus an out-of-band send button, as returned to polls.
pub fn feed_update(snapshot: &WidgetSnapshot, renderer: &dyn MarkdownRenderer) -> String {
    format!(
        "{}\n{}",
        chat_feed(snapshot, renderer),
        send_button(snapshot, true)
    )
}

/// Conversation, typing indicator, poll trigger and quick prompts.
pub fn chat_feed(snapshot: &WidgetSnapshot, renderer: &dyn MarkdownRenderer) -> String {
    let id = escape_html(&snapshot.id);

    let mut bubbles = String::new();
    for message in &snapshot.messages {
        bubbles.push_str(&message_bubble(message, renderer));
    }
    if snapshot.awaiting_response {
        bubbles.push_str(&typing_indicator());
    }

    let poll = if snapshot.awaiting_response {
        format!(
            r##"<div hidden hx-get="/chat/{id}/feed" hx-trigger="load delay:{POLL_DELAY}" hx-target="#{FEED_ID}" hx-swap="outerHTML"></div>"##
        )
    } else {
        String::new()
    };

    format!(
        r#"<div id="{FEED_ID}" class="flex-1 flex flex-col min-h-0" data-revision="{revision}" data-awaiting="{awaiting}">
    <div id="chat-scroller" class="flex-1 p-6 lg:p-8 bg-white overflow-y-auto" aria-live="polite" aria-label="Chat messages">
        <div class="space-y-6">{bubbles}</div>
    </div>
    {poll}
    {prompts}
    <script>(function(){{var s=document.getElementById('chat-scroller');if(s){{s.scrollTop=s.scrollHeight;}}}})();</script>
</div>"#,
        revision = snapshot.revision,
        awaiting = snapshot.awaiting_response,
        prompts = quick_prompts(snapshot),
    )
}

/// One message bubble. Assistant text is markdown; user text is literal.
pub fn message_bubble(message: &Message, renderer: &dyn MarkdownRenderer) -> String {
    let (role, avatar_bg, bubble_bg, body) = match message.role {
        Role::Assistant => (
            "assistant",
            "bg-emerald-100",
            "bg-emerald-50 text-stone-800",
            format!(
                r#"<div class="prose prose-stone prose-sm max-w-none">{}</div>"#,
                renderer.render(&message.text)
            ),
        ),
        Role::User => (
            "user",
            "bg-rose-100",
            "bg-rose-50 text-stone-900",
            format!(
                r#"<div class="whitespace-pre-wrap">{}</div>"#,
                escape_html(&message.text)
            ),
        ),
    };

    bubble(
        &format!(r#"data-role="{role}" data-message-id="{}""#, message.id),
        avatar_bg,
        bubble_bg,
        &body,
        &escape_html(&message.time),
    )
}

/// Transient three-dot bubble shown while waiting. Not part of the conversation.
pub fn typing_indicator() -> String {
    let dots = r#"<span class="inline-flex items-center gap-1"><span class="w-2 h-2 bg-stone-500/60 rounded-full animate-bounce [animation-delay:-0.2s]"></span><span class="w-2 h-2 bg-stone-500/60 rounded-full animate-bounce"></span><span class="w-2 h-2 bg-stone-500/60 rounded-full animate-bounce [animation-delay:0.2s]"></span></span>"#;
    bubble(
        r#"data-typing-indicator="true""#,
        "bg-emerald-100",
        "bg-emerald-50 text-stone-800",
        dots,
        &clock_label(),
    )
}

fn bubble(attrs: &str, avatar_bg: &str, bubble_bg: &str, body: &str, time: &str) -> String {
    format!(
        r#"<div class="flex gap-3" {attrs}>
    <div class="w-10 h-10 rounded-2xl {avatar_bg} flex items-center justify-center">{avatar}</div>
    <div class="flex-1">
        <div class="rounded-2xl p-4 leading-relaxed {bubble_bg}">{body}</div>
        <div class="mt-2 text-xs text-stone-500">{time}</div>
    </div>
</div>"#,
        avatar = icons::bot("text-stone-700"),
    )
}

fn quick_prompts(snapshot: &WidgetSnapshot) -> String {
    let id = escape_html(&snapshot.id);
    let disabled = if snapshot.quick_prompts_enabled() { "" } else { " disabled" };

    let mut buttons = String::new();
    for (index, prompt) in QUICK_PROMPTS.iter().enumerate() {
        let _ = write!(
            buttons,
            r##"<button type="button" class="px-4 py-2 rounded-2xl border border-stone-200 bg-white hover:bg-stone-50 text-sm disabled:opacity-60" data-quick-prompt="{index}" hx-post="/chat/{id}/quick/{index}" hx-target="#{PANEL_ID}" hx-swap="outerHTML"{disabled}>{label}</button>"##,
            label = escape_html(prompt),
        );
    }

    format!(
        r#"<div class="px-6 lg:px-8 pb-4">
        <div class="text-stone-700 font-medium mb-3">Quick questions to get started:</div>
        <div class="flex flex-wrap gap-3">{buttons}</div>
    </div>"#
    )
}

fn input_area(snapshot: &WidgetSnapshot) -> String {
    let id = escape_html(&snapshot.id);
    // A JSON string is a valid JS string literal.
    let draft = serde_json::Value::String(snapshot.input.clone()).to_string();

    format!(
        r##"<div class="p-4 lg:p-6 border-t border-stone-200 bg-white">
        <form class="flex items-center gap-3" hx-post="/chat/{id}/messages" hx-target="#{PANEL_ID}" hx-swap="outerHTML" x-data="{{ message: {draft} }}">
            <input name="message" value="{value}" x-model="message" autocomplete="off" placeholder="Type your skincare question…" class="flex-1 h-12 rounded-2xl bg-stone-50 border border-stone-200 px-4 outline-none focus:ring-2 focus:ring-rose-300"/>
            {button}
        </form>
    </div>"##,
        draft = escape_html(&draft),
        value = escape_html(&snapshot.input),
        button = send_button(snapshot, false),
    )
}

/// The send button. `oob` marks it for an out-of-band swap into the form.
fn send_button(snapshot: &WidgetSnapshot, oob: bool) -> String {
    let awaiting = snapshot.awaiting_response;
    let disabled = if snapshot.can_send() { "" } else { " disabled" };
    let oob = if oob { r#" hx-swap-oob="true""# } else { "" };

    format!(
        r#"<button id="{SEND_BUTTON_ID}" type="submit" aria-label="Send" class="w-12 h-12 rounded-2xl bg-rose-300 hover:bg-rose-400 text-white flex items-center justify-center transition disabled:opacity-60" x-bind:disabled="{awaiting} || !message.trim()"{oob}{disabled}>{icon}</button>"#,
        icon = icons::send(""),
    )
}
