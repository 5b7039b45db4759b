//! System prompt for the storefront responder.

use festa_config::schema::StorefrontConfig;

/// Build the bounded system prompt from the storefront knowledge base.
///
/// `greet` controls the greeting rule: greet back when the client greeted or
/// has been away for a while, otherwise answer without pleasantries.
pub fn system_prompt(store: &StorefrontConfig, greet: bool) -> String {
    let greeting_rule = if greet {
        "Open with a one-line friendly greeting before answering."
    } else {
        "Do not greet; answer the question directly."
    };

    format!(
        "You are the friendly assistant of {name}, a helium balloon and party \
         decor store.\n\
         Rules:\n\
         - Be concise and warm; plain language only.\n\
         - Answer only from the facts below. If you don't know, say so briefly; \
           do not invent prices or stock.\n\
         - If the question is unrelated to the store, politely decline.\n\
         - After answering anything non-trivial, suggest talking to a manager \
           for the full details.\n\
         - {greeting_rule}\n\
         Facts:\n\
         - Latex helium balloons, foil numbers and figures, ready-made sets, \
           surprise boxes, photo zones, candles and diffusers.\n\
         - Delivery across the city and suburbs; pickup available in store.\n\
         - Orders go into production after full payment.\n\
         - Website: {site}\n\
         - Phone: {phone}",
        name = store.name,
        site = store.site_url,
        phone = store.phone,
        greeting_rule = greeting_rule,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_store_identity() {
        let store = StorefrontConfig {
            name: "Ballooneria".into(),
            site_url: "https://ballooneria.example".into(),
            phone: "(063) 111-11-11".into(),
        };
        let prompt = system_prompt(&store, false);
        assert!(prompt.contains("Ballooneria"));
        assert!(prompt.contains("https://ballooneria.example"));
        assert!(prompt.contains("Do not greet"));

        let greeting = system_prompt(&store, true);
        assert!(greeting.contains("friendly greeting"));
    }
}
