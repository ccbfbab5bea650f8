//! Full-page HTML: shell, hero section and the chat card.

use crate::markdown::{MarkdownRenderer, escape_html};
use crate::widget::WidgetSnapshot;

use super::chat::chat_panel;
use super::icons;

/// Static feature tiles shown in the hero section: (icon, title, description).
const FEATURES: [(fn(&str) -> String, &str, &str); 4] = [
    (icons::flame, "Skin Analysis", "Identify your skin type and concerns"),
    (icons::leaf, "Natural Solutions", "Gentle, science‑backed recommendations"),
    (icons::heart, "Custom Routines", "Personalized morning & evening care"),
    (icons::wand, "AI‑Powered", "Smart insights from beauty experts"),
];

/// Generate the HTML shell for the application.
pub fn html_shell(title: &str, content: &str) -> String {
    let title = escape_html(title);
    let brand = icons::sparkles("text-rose-400");
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="GlowAdvisor - your personal skincare assistant">
    <title>{title} - GlowAdvisor</title>

    <!-- HTMX and Alpine (local) -->
    <script src="/static/vendor/htmx-2.0.8.min.js"></script>
    <script defer src="/static/vendor/alpine.min.js"></script>
    <link rel="stylesheet" href="/static/app.css">
</head>
<body class="min-h-screen bg-[#fbf2ec] text-stone-900">
    <header class="sticky top-0 z-20 bg-[#fbf2ec]/80 backdrop-blur border-b border-rose-100">
        <div class="mx-auto max-w-7xl px-4 sm:px-6 lg:px-8 h-16 flex items-center justify-between">
            <div class="flex items-center gap-3">
                <div class="w-10 h-10 rounded-full bg-rose-100 flex items-center justify-center shadow-sm">{brand}</div>
                <span class="text-2xl font-semibold tracking-tight"><span class="text-stone-800">Glow</span><span class="text-rose-400">Advisor</span></span>
            </div>
            <button type="button" disabled class="hidden sm:inline-flex text-sm font-medium px-4 py-2 rounded-xl border border-stone-200">Sign In</button>
        </div>
    </header>

    <main class="mx-auto max-w-7xl px-4 sm:px-6 lg:px-8 py-10 lg:py-14">
        {content}
    </main>

    <footer class="py-10"></footer>
</body>
</html>"#
    )
}

/// Hero column: headline, copy, feature tiles and product image.
pub fn hero() -> String {
    let tiles: String = FEATURES
        .iter()
        .map(|(icon, title, desc)| feature_card(&icon(""), title, desc))
        .collect();

    format!(
        r#"<div>
    <h1 class="text-5xl sm:text-6xl font-extrabold leading-[1.05] tracking-tight text-stone-900">
        Your Personal <span class="text-rose-400">Skincare</span> Assistant
    </h1>
    <p class="mt-6 text-lg text-stone-600 max-w-2xl">
        Get personalized skincare advice, product recommendations, and routine guidance from our AI‑powered beauty
        expert. Transform your skin with expert knowledge tailored just for you.
    </p>
    <div class="mt-8 grid sm:grid-cols-2 gap-5">{tiles}</div>
    <div class="mt-8 rounded-3xl overflow-hidden shadow-sm">
        <img src="/static/skincare1.png" alt="Skincare cream jar" class="w-full h-auto object-cover">
    </div>
</div>"#
    )
}

fn feature_card(icon: &str, title: &str, desc: &str) -> String {
    format!(
        r#"<div class="rounded-2xl bg-white/70 backdrop-blur border border-rose-100 p-5 flex items-start gap-4" data-feature-tile>
        <div class="w-10 h-10 rounded-2xl bg-rose-50 flex items-center justify-center text-rose-400">{icon}</div>
        <div>
            <div class="font-semibold text-stone-800 text-lg">{title}</div>
            <div class="text-stone-600 text-sm max-w-xs">{desc}</div>
        </div>
    </div>"#,
        title = escape_html(title),
        desc = escape_html(desc),
    )
}

/// Chat card: header plus the swappable panel.
pub fn chat_card(snapshot: &WidgetSnapshot, renderer: &dyn MarkdownRenderer) -> String {
    format!(
        r#"<div class="flex">
    <div class="w-full rounded-3xl bg-white/70 backdrop-blur overflow-hidden border border-rose-100 shadow-sm flex flex-col">
        <div class="bg-rose-200/70 px-6 py-5 border-b border-rose-100">
            <div class="flex items-center gap-3">
                <div class="w-10 h-10 rounded-full bg-white flex items-center justify-center">{icon}</div>
                <div>
                    <div class="font-semibold text-stone-800">GlowAdvisor AI</div>
                    <div class="text-sm text-stone-600">Your personal beauty advisor</div>
                </div>
            </div>
        </div>
        {panel}
    </div>
</div>"#,
        icon = icons::sparkles("text-rose-400"),
        panel = chat_panel(snapshot, renderer),
    )
}

/// The complete index page for a freshly created widget.
pub fn index_page(snapshot: &WidgetSnapshot, renderer: &dyn MarkdownRenderer) -> String {
    let content = format!(
        r#"<div class="grid lg:grid-cols-2 gap-10">
{hero}
{card}
</div>"#,
        hero = hero(),
        card = chat_card(snapshot, renderer),
    );
    html_shell("Skincare Assistant", &content)
}
