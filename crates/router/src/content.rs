//! Menu labels, catalog sections, FAQ topics, and the keyboards built from
//! them. Pure data and constructors; no state.

use festa_common::{
    transport::{Button, Keyboard},
    types::actions,
};

pub mod labels {
    pub const CATALOG: &str = "🛍 Catalog";
    pub const FAQ: &str = "❓ FAQ";
    pub const WEBSITE: &str = "🌐 Website";
    pub const CONTACTS: &str = "📞 Contacts";
    pub const SEARCH: &str = "🔍 Search";
    pub const MANAGER: &str = "💬 Manager";
    pub const PROFILE: &str = "👤 Profile";
    pub const HOME: &str = "🏠 Main menu";

    pub const OP_CLIENTS: &str = "📋 Clients";
    pub const OP_JOURNAL: &str = "📒 Journal";
    pub const OP_HISTORY: &str = "🔍 History";
    pub const OP_STATS: &str = "📊 Stats";
    pub const OP_BROADCAST: &str = "📣 Broadcast";
    pub const OP_END_CHAT: &str = "🛑 End chat";
}

/// Reserved operator vocabulary: these labels always win over free-text relay.
pub const OPERATOR_COMMANDS: &[&str] = &[
    labels::OP_CLIENTS,
    labels::OP_JOURNAL,
    labels::OP_HISTORY,
    labels::OP_STATS,
    labels::OP_BROADCAST,
    labels::OP_END_CHAT,
];

pub fn main_menu() -> Keyboard {
    Keyboard::reply(&[
        &[labels::CATALOG, labels::FAQ],
        &[labels::WEBSITE, labels::CONTACTS],
        &[labels::SEARCH, labels::MANAGER],
        &[labels::PROFILE],
    ])
}

pub fn operator_menu() -> Keyboard {
    Keyboard::reply(&[
        &[labels::OP_CLIENTS, labels::OP_JOURNAL],
        &[labels::OP_HISTORY, labels::OP_STATS],
        &[labels::OP_BROADCAST, labels::OP_END_CHAT],
    ])
}

/// The only button shown to a client inside a live manager chat.
pub fn in_chat_menu() -> Keyboard {
    Keyboard::reply(&[&[labels::HOME]])
}

pub struct CatalogItem {
    pub slug: &'static str,
    pub label: &'static str,
    pub blurb: &'static str,
    pub path: &'static str,
}

pub struct CatalogSection {
    pub slug: &'static str,
    pub label: &'static str,
    pub heading: &'static str,
    pub items: &'static [CatalogItem],
}

pub const CATALOG: &[CatalogSection] = &[
    CatalogSection {
        slug: "latex",
        label: "🎈 Latex balloons",
        heading: "Latex helium balloons — pick a style:",
        items: &[
            CatalogItem {
                slug: "latex_plain",
                label: "🔴 Solid colors",
                blurb: "Classic single-color balloons: pastel, metallic, chrome.",
                path: "/latex-balloons/",
            },
            CatalogItem {
                slug: "latex_print",
                label: "🎨 With prints",
                blurb: "Bright balloons with prints and lettering.",
                path: "/printed-balloons/",
            },
            CatalogItem {
                slug: "latex_confetti",
                label: "✨ Confetti",
                blurb: "Clear balloons with colorful confetti inside.",
                path: "/confetti-balloons/",
            },
        ],
    },
    CatalogSection {
        slug: "foil",
        label: "✨ Foil balloons",
        heading: "Foil helium balloons — pick a type:",
        items: &[
            CatalogItem {
                slug: "foil_figures",
                label: "🦄 Figures",
                blurb: "Character and animal shaped balloons.",
                path: "/foil-figures/",
            },
            CatalogItem {
                slug: "foil_numbers",
                label: "🔢 Numbers",
                blurb: "Number balloons for birthdays and anniversaries.",
                path: "/foil-numbers/",
            },
            CatalogItem {
                slug: "foil_hearts",
                label: "💖 Hearts & stars",
                blurb: "Romantic hearts and festive stars.",
                path: "/hearts-and-stars/",
            },
        ],
    },
    CatalogSection {
        slug: "sets",
        label: "🎁 Ready-made sets",
        heading: "Ready-made sets — pick a kind:",
        items: &[
            CatalogItem {
                slug: "sets_bouquets",
                label: "🎈 Balloon bouquets",
                blurb: "Composed balloon bouquets for any occasion.",
                path: "/balloon-bouquets/",
            },
            CatalogItem {
                slug: "sets_boxes",
                label: "📦 Surprise boxes",
                blurb: "Boxes with balloons inside — an unforgettable surprise.",
                path: "/surprise-boxes/",
            },
            CatalogItem {
                slug: "sets_photozone",
                label: "📸 Photo zones",
                blurb: "Photo zones and balloon garlands.",
                path: "/photo-zones/",
            },
        ],
    },
    CatalogSection {
        slug: "party",
        label: "🎉 Party goods",
        heading: "Party goods — pick a category:",
        items: &[
            CatalogItem {
                slug: "party_candles",
                label: "🕯 Candles",
                blurb: "Cake candles and scented decor candles.",
                path: "/candles/",
            },
            CatalogItem {
                slug: "party_decor",
                label: "🎪 Party decor",
                blurb: "Everything else for decorating a celebration.",
                path: "/party-decor/",
            },
        ],
    },
];

pub fn find_section(slug: &str) -> Option<&'static CatalogSection> {
    CATALOG.iter().find(|s| s.slug == slug)
}

pub fn find_item(slug: &str) -> Option<&'static CatalogItem> {
    CATALOG.iter().flat_map(|s| s.items).find(|i| i.slug == slug)
}

pub struct FaqTopic {
    pub slug: &'static str,
    pub label: &'static str,
    pub text: &'static str,
}

pub const FAQ_TOPICS: &[FaqTopic] = &[
    FaqTopic {
        slug: "delivery",
        label: "🚚 Delivery & payment",
        text: "🚚 DELIVERY & PAYMENT\n\n\
               💳 Payment: online on the website, by bank transfer, or in store \
               on pickup.\n\
               🚚 Delivery: across the city and suburbs via courier; the fare \
               is on the recipient.\n\
               🛒 Pickup: available in store during opening hours.\n\n\
               ⚠️ Orders go into production after full payment; allow up to \
               90 minutes for preparation.",
    },
    FaqTopic {
        slug: "balloons",
        label: "🎈 Balloons & helium",
        text: "🎈 BALLOONS & HELIUM\n\n\
               ⏱ Float time: treated latex 5–20 days, foil 7–40 days (foil can \
               be re-inflated).\n\
               🎨 Latex styles: pastel, metallic, chrome, confetti, printed.\n\
               ✨ Foil: numbers, figures, hearts, stars.",
    },
    FaqTopic {
        slug: "orders",
        label: "📅 Ordering & lead times",
        text: "📅 ORDERING & LEAD TIMES\n\n\
               🛒 Online: around the clock on the website.\n\
               📞 By phone or chat: during store hours.\n\n\
               To place an order we need the delivery address, the preferred \
               time, a phone number, and any decoration wishes.",
    },
    FaqTopic {
        slug: "decor",
        label: "🎁 Decoration & events",
        text: "🎁 DECORATION & EVENTS\n\n\
               We decorate birthdays, weddings, graduations, gender parties \
               and more: bouquets, arches, garlands, photo zones, number \
               balloons, surprise boxes with personalised lettering. On-site \
               decoration by our team is available.",
    },
    FaqTopic {
        slug: "contacts",
        label: "📞 Contacts & hours",
        text: "📞 CONTACTS & HOURS\n\n\
               Ordering online is available around the clock; the stores \
               handle pickup during their posted hours. Phone and website are \
               in the Contacts menu.",
    },
];

pub fn find_faq(slug: &str) -> Option<&'static FaqTopic> {
    FAQ_TOPICS.iter().find(|t| t.slug == slug)
}

/// Topics offered before connecting a client to a manager.
pub struct PrefilterTopic {
    pub slug: &'static str,
    pub label: &'static str,
    /// Queue topic shown to operators.
    pub topic: &'static str,
    /// Connect immediately instead of showing an intermediate card.
    pub direct: bool,
}

pub const PREFILTER_TOPICS: &[PrefilterTopic] = &[
    PrefilterTopic {
        slug: "price",
        label: "💰 Price question",
        topic: "Price question",
        direct: false,
    },
    PrefilterTopic {
        slug: "delivery",
        label: "🚚 Delivery & payment",
        topic: "Delivery question",
        direct: false,
    },
    PrefilterTopic {
        slug: "balloons",
        label: "🎈 Choosing balloons",
        topic: "Choosing balloons",
        direct: false,
    },
    PrefilterTopic {
        slug: "event",
        label: "🎉 Event decoration",
        topic: "Event decoration",
        direct: false,
    },
    PrefilterTopic {
        slug: "urgent",
        label: "🚨 Urgent question",
        topic: "Urgent question",
        direct: true,
    },
    PrefilterTopic {
        slug: "other",
        label: "❓ Something else",
        topic: "Other question",
        direct: true,
    },
];

pub fn find_prefilter(slug: &str) -> Option<&'static PrefilterTopic> {
    PREFILTER_TOPICS.iter().find(|t| t.slug == slug)
}

// ── Keyboard constructors ───────────────────────────────────────────────────

pub fn catalog_menu() -> Keyboard {
    let mut rows: Vec<Vec<Button>> = CATALOG
        .iter()
        .map(|s| vec![Button::action(s.label, format!("cat:{}", s.slug))])
        .collect();
    rows.push(vec![Button::action(labels::HOME, actions::HOME)]);
    Keyboard::inline(rows)
}

pub fn section_menu(section: &CatalogSection) -> Keyboard {
    let mut rows: Vec<Vec<Button>> = section
        .items
        .iter()
        .map(|i| vec![Button::action(i.label, format!("item:{}", i.slug))])
        .collect();
    rows.push(vec![Button::action("⬅️ Back", "catalog")]);
    Keyboard::inline(rows)
}

pub fn product_card(item: &CatalogItem, site_url: &str) -> (String, Keyboard) {
    let text = format!("{}\n\n{}", item.label, item.blurb);
    let keyboard = Keyboard::inline(vec![
        vec![Button::url(
            "🔗 View on the website",
            format!("{}{}", site_url.trim_end_matches('/'), item.path),
        )],
        vec![Button::action("💬 Ask a manager", "contact")],
        vec![Button::action("⬅️ Back to catalog", "catalog")],
        vec![Button::action(labels::HOME, actions::HOME)],
    ]);
    (text, keyboard)
}

pub fn faq_menu() -> Keyboard {
    let mut rows: Vec<Vec<Button>> = FAQ_TOPICS
        .iter()
        .map(|t| vec![Button::action(t.label, format!("faq:{}", t.slug))])
        .collect();
    rows.push(vec![Button::action(labels::HOME, actions::HOME)]);
    Keyboard::inline(rows)
}

pub fn prefilter_menu() -> Keyboard {
    Keyboard::inline(
        PREFILTER_TOPICS
            .iter()
            .map(|t| vec![Button::action(t.label, format!("filter:{}", t.slug))])
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookups() {
        assert!(find_section("latex").is_some());
        assert!(find_section("nothing").is_none());
        assert_eq!(find_item("foil_numbers").unwrap().label, "🔢 Numbers");
    }

    #[test]
    fn product_card_links_into_the_site() {
        let item = find_item("latex_plain").unwrap();
        let (_, keyboard) = product_card(item, "https://shop.example/");
        let Button::Url { url, .. } = &keyboard.rows[0][0] else {
            panic!("first row must be the site link");
        };
        assert_eq!(url, "https://shop.example/latex-balloons/");
    }

    #[test]
    fn every_prefilter_slug_resolves() {
        for topic in PREFILTER_TOPICS {
            assert!(find_prefilter(topic.slug).is_some());
        }
    }

    #[test]
    fn operator_commands_cover_the_menu() {
        for row in &operator_menu().rows {
            for button in row {
                let Button::Action { label, .. } = button else {
                    panic!("operator menu is labels only");
                };
                assert!(OPERATOR_COMMANDS.contains(&label.as_str()));
            }
        }
    }
}
