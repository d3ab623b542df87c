// SPDX-License-Identifier: GPL-3.0-or-later

//! The listing row controller.
//!
//! A [`Controller`] owns one loaded page. [`Controller::initialize`] sets up
//! every listing table and binds every listing form's buttons. Clicking a
//! button sends its request from a worker thread; replies are applied to the
//! page on the caller's thread by [`Controller::pump`], in the order in which
//! they arrive. Nothing orders or cancels requests, so when the same button is
//! clicked twice the reply that arrives last wins.

use std::{
    sync::{mpsc, Arc},
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use crate::{
    action::{ButtonConfig, Target, Update, Variant, ATTR_LISTING_ID},
    error::{ActionError, BindError},
    markup::{Document, Glyph, GlyphColor, NodeId},
    table::{ListingTable, WidthMode},
    transport::{HttpReply, Transport},
};

/// Delay between a successful action and following its next-listing link.
pub const NAVIGATION_DELAY: Duration = Duration::from_millis(100);

/// How long a failed action stays visible.
pub const NOTICE_LIFETIME: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerOptions {
    pub variant: Variant,
    pub width: WidthMode,
}

/// A click on a listing button.
#[derive(Debug, Default)]
pub struct ClickEvent {
    default_prevented: bool,
}
impl ClickEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// A failed action, shown to the user until it expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub listing_id: String,
    pub target: Target,
    pub error: ActionError,
    pub expires: Instant,
}
impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of listing {} failed: {}",
            self.target.as_str(),
            self.listing_id,
            self.error
        )
    }
}

#[derive(Debug)]
struct Completion {
    button: NodeId,
    result: Result<HttpReply, ActionError>,
}

#[derive(Debug)]
pub struct Controller {
    document: Document,
    options: ControllerOptions,
    transport: Arc<dyn Transport>,
    tables: Vec<ListingTable>,
    buttons: Vec<ButtonConfig>,
    completion_send: mpsc::Sender<Completion>,
    completion_recv: mpsc::Receiver<Completion>,
    arrived: Vec<Completion>,
    in_flight: usize,
    navigations: Vec<(String, Instant)>,
    navigation: Option<String>,
    notices: Vec<Notice>,
}
impl Controller {
    /// Set up all listing tables and bind all listing buttons of `document`.
    ///
    /// Fails if any listing button cannot be bound, e.g. because its
    /// `data-target` is not a known action.
    pub fn initialize(
        document: Document,
        options: ControllerOptions,
        transport: Arc<dyn Transport>,
    ) -> Result<Controller, BindError> {
        let (completion_send, completion_recv) = mpsc::channel();
        let mut controller = Controller {
            document,
            options,
            transport,
            tables: Vec::new(),
            buttons: Vec::new(),
            completion_send,
            completion_recv,
            arrived: Vec::new(),
            in_flight: 0,
            navigations: Vec::new(),
            navigation: None,
            notices: Vec::new(),
        };

        for node in controller.document.select_class("datatables") {
            controller.initialize_table(node);
        }
        for form in controller.document.select_class("listing-form") {
            controller.bind_row_buttons(form)?;
        }

        info!(
            "Bound {} buttons in {} tables ({:?})",
            controller.buttons.len(),
            controller.tables.len(),
            options.variant
        );
        Ok(controller)
    }

    pub fn initialize_table(&mut self, node: NodeId) -> &ListingTable {
        let table = ListingTable::initialize(&self.document, node, self.options.width);
        self.tables.push(table);
        &self.tables[self.tables.len() - 1]
    }

    pub fn bind_row_buttons(&mut self, form: NodeId) -> Result<(), BindError> {
        let listing_id = self
            .document
            .attr(form, ATTR_LISTING_ID)
            .ok_or(BindError::MissingListingId)?
            .to_string();

        for button in self.document.find_tag(form, "button") {
            if self.button(button).is_some() {
                continue;
            }
            let config = ButtonConfig::bind(&self.document, &listing_id, button)?;
            debug!(
                "Bound {} button of listing {} to {}",
                config.target.as_str(),
                listing_id,
                config.endpoint
            );
            self.buttons.push(config);
        }
        Ok(())
    }

    /// Handle a click on `button`.
    ///
    /// The event's default action is always suppressed. Returns false if
    /// `button` is not a bound listing button, in which case no request is
    /// sent.
    pub fn on_button_click(&mut self, button: NodeId, event: &mut ClickEvent) -> bool {
        event.prevent_default();

        let Some(config) = self.button(button) else {
            warn!("Click on unbound button {:?}", button);
            return false;
        };
        debug!(
            "{} listing {} via {}",
            config.target.as_str(),
            config.listing_id,
            config.endpoint
        );

        let endpoint = config.endpoint.clone();
        let transport = self.transport.clone();
        let send = self.completion_send.clone();
        self.in_flight += 1;

        std::thread::spawn(move || {
            let result = transport.post(&endpoint);
            // The receiver is gone once the page has been replaced.
            let _ = send.send(Completion { button, result });
        });

        true
    }

    pub fn click(&mut self, button: NodeId) -> ClickEvent {
        let mut event = ClickEvent::new();
        self.on_button_click(button, &mut event);
        event
    }

    /// Apply all replies that have arrived, then advance fades, navigations
    /// and notices to `now`.
    pub fn pump(&mut self, now: Instant) {
        while let Ok(completion) = self.completion_recv.try_recv() {
            self.arrived.push(completion);
        }
        for completion in std::mem::take(&mut self.arrived) {
            self.in_flight -= 1;
            self.complete(completion, now);
        }

        for table in &mut self.tables {
            for row in table.finish_fades(&mut self.document, now) {
                debug!("Removed row {:?}", self.document.element_id(row));
            }
        }

        if self.navigation.is_none() {
            let due = self
                .navigations
                .iter()
                .filter(|(_, at)| *at <= now)
                .min_by_key(|(_, at)| *at);
            if let Some((url, _)) = due {
                info!("Navigating to {}", url);
                self.navigation = Some(url.clone());
                self.navigations.clear();
            }
        }

        self.notices.retain(|notice| notice.expires > now);
    }

    /// Block until every request sent so far has received its reply, or until
    /// `timeout` passes. Replies are not applied until the next
    /// [`pump`](Self::pump). Returns false on timeout.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.arrived.len() < self.in_flight {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completion_recv.recv_timeout(remaining) {
                Ok(completion) => self.arrived.push(completion),
                Err(_) => return false,
            }
        }
        true
    }

    fn complete(&mut self, completion: Completion, now: Instant) {
        let Some(config) = self.button(completion.button).cloned() else {
            return;
        };

        let variant = self.options.variant;
        let result = completion
            .result
            .and_then(HttpReply::into_success)
            .and_then(|body| Update::decode(config.target, variant, &body));

        match result {
            Ok(update) => {
                self.apply(&config, update, now);
                if variant == Variant::ToggleAndAdvance {
                    if let Some(url) = &config.next_listing {
                        self.navigations.push((url.clone(), now + NAVIGATION_DELAY));
                    }
                }
            }
            Err(error) => {
                warn!(
                    "{} of listing {} failed: {}",
                    config.target.as_str(),
                    config.listing_id,
                    error
                );
                self.notices.push(Notice {
                    listing_id: config.listing_id,
                    target: config.target,
                    error,
                    expires: now + NOTICE_LIFETIME,
                });
            }
        }
    }

    fn apply(&mut self, config: &ButtonConfig, update: Update, now: Instant) {
        match update {
            Update::RemoveRow => {
                let Some(row) = config.row else {
                    debug!("No row to remove for listing {}", config.listing_id);
                    return;
                };
                match self
                    .tables
                    .iter_mut()
                    .find(|table| table.contains(&self.document, row))
                {
                    Some(table) => {
                        table.fade_out(&self.document, row, now);
                    }
                    None => self.document.detach(row),
                }
            }
            Update::SetScore(score) => {
                let text = score.to_string();
                for &display in &config.score_displays {
                    self.document.set_text(display, text.clone());
                }
            }
            Update::SetStarred(starred) => {
                let color = if starred {
                    GlyphColor::Gold
                } else {
                    GlyphColor::Black
                };
                self.document.set_glyph(config.button, Glyph::star(color));
            }
            Update::SetRejected(rejected) => {
                let color = if rejected {
                    GlyphColor::Red
                } else {
                    GlyphColor::Black
                };
                self.document.set_glyph(config.button, Glyph::reject(color));
            }
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    pub fn tables(&self) -> &[ListingTable] {
        &self.tables
    }

    pub fn buttons(&self) -> &[ButtonConfig] {
        &self.buttons
    }

    pub fn button(&self, button: NodeId) -> Option<&ButtonConfig> {
        self.buttons.iter().find(|config| config.button == button)
    }

    /// Bound buttons inside `row`, in document order.
    pub fn buttons_in(&self, row: NodeId) -> Vec<&ButtonConfig> {
        self.buttons
            .iter()
            .filter(|config| self.document.ancestors(config.button).any(|n| n == row))
            .collect()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// The URL of a navigation that has fired, if any.
    pub fn take_navigation(&mut self) -> Option<String> {
        self.navigation.take()
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        action::{ATTR_LISTING_URL, ATTR_NEXT_LISTING, ATTR_TARGET},
        markup::{Content, Element},
    };

    #[derive(Debug, Default)]
    struct FakeTransport {
        replies: HashMap<String, Result<HttpReply, ActionError>>,
    }
    impl FakeTransport {
        fn reply(mut self, url: &str, reply: Result<HttpReply, ActionError>) -> Self {
            self.replies.insert(url.to_string(), reply);
            self
        }
    }
    impl Transport for FakeTransport {
        fn post(&self, url: &str) -> Result<HttpReply, ActionError> {
            self.replies
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(ActionError::Network(format!("no reply for {url}"))))
        }

        fn get(&self, url: &str) -> Result<HttpReply, ActionError> {
            self.post(url)
        }
    }

    fn button(target: &str, next: &str) -> Element {
        Element::new("button")
            .attr(ATTR_TARGET, target)
            .attr(ATTR_LISTING_URL, format!("/listing/3/{target}"))
            .attr(ATTR_NEXT_LISTING, next)
    }

    fn page(next: &str) -> Document {
        Document::new(
            Element::new("table").class("datatables").child(
                Element::new("tbody").child(
                    Element::new("tr").id("listing-3").children([
                        Element::new("td").text("Studio near the park"),
                        Element::new("td").child(
                            Element::new("form")
                                .class("listing-form")
                                .attr(ATTR_LISTING_ID, "3")
                                .children([
                                    Element::new("span").class("score").text("0"),
                                    button("score", next),
                                    button("star", next),
                                    button("reject", next),
                                ]),
                        ),
                    ]),
                ),
            ),
        )
    }

    fn controller(variant: Variant, next: &str, transport: FakeTransport) -> Controller {
        Controller::initialize(
            page(next),
            ControllerOptions {
                variant,
                ..Default::default()
            },
            Arc::new(transport),
        )
        .unwrap()
    }

    fn target_button(controller: &Controller, target: Target) -> NodeId {
        controller
            .buttons()
            .iter()
            .find(|config| config.target == target)
            .unwrap()
            .button
    }

    #[test]
    fn binds_every_button() {
        let controller = controller(Variant::RemoveRow, "", FakeTransport::default());
        assert_eq!(controller.tables().len(), 1);
        assert_eq!(controller.buttons().len(), 3);
        let row = controller.document().find_by_id("listing-3").unwrap();
        assert_eq!(controller.buttons_in(row).len(), 3);
    }

    #[test]
    fn star_toggles_glyph() {
        let transport =
            FakeTransport::default().reply("/listing/3/star", Ok(HttpReply::ok(r#"{"starred": true}"#)));
        let mut controller = controller(Variant::RemoveRow, "", transport);
        let star = target_button(&controller, Target::Star);

        let event = controller.click(star);
        assert!(event.default_prevented());
        assert!(controller.wait_idle(Duration::from_secs(5)));
        controller.pump(Instant::now());

        assert_eq!(
            controller.document().content(star),
            &Content::Glyph(Glyph::star(GlyphColor::Gold))
        );
        assert!(controller.notices().is_empty());
        assert_eq!(controller.in_flight(), 0);
    }

    #[test]
    fn updates_replace_rendered_markup() {
        let form = Element::new("form")
            .class("listing-form")
            .attr(ATTR_LISTING_ID, "3")
            .children([
                Element::new("span")
                    .class("score")
                    .child(Element::new("b").text("10")),
                Element::new("span").class("score").text("10"),
                button("score", ""),
                button("star", "").child(Element::new("span").text("⭑")),
            ]);
        let transport = FakeTransport::default()
            .reply("/listing/3/score", Ok(HttpReply::ok(r#"{"score": 42}"#)))
            .reply("/listing/3/star", Ok(HttpReply::ok(r#"{"starred": true}"#)));
        let mut controller = Controller::initialize(
            Document::new(form),
            ControllerOptions::default(),
            Arc::new(transport),
        )
        .unwrap();
        let score = target_button(&controller, Target::Score);
        let star = target_button(&controller, Target::Star);
        let displays = controller.button(score).unwrap().score_displays.clone();
        assert_eq!(displays.len(), 2);

        controller.click(score);
        controller.click(star);
        assert!(controller.wait_idle(Duration::from_secs(5)));
        controller.pump(Instant::now());

        let doc = controller.document();
        for display in displays {
            assert_eq!(doc.text_content(display), "42");
        }
        assert_eq!(doc.text_content(star), "⭑");
        assert!(doc.children(star).is_empty());
        assert_eq!(doc.content(star), &Content::Glyph(Glyph::star(GlyphColor::Gold)));
    }

    #[test]
    fn failure_records_notice() {
        let transport =
            FakeTransport::default().reply("/listing/3/score", Ok(HttpReply::status(500)));
        let mut controller = controller(Variant::RemoveRow, "", transport);
        let score = target_button(&controller, Target::Score);
        let display = controller.button(score).unwrap().score_displays[0];

        controller.click(score);
        assert!(controller.wait_idle(Duration::from_secs(5)));
        let now = Instant::now();
        controller.pump(now);

        assert_eq!(controller.document().text_content(display), "0");
        assert_eq!(controller.notices().len(), 1);
        assert_eq!(
            controller.notices()[0].error,
            ActionError::Server { status: 500 }
        );

        controller.pump(now + NOTICE_LIFETIME);
        assert!(controller.notices().is_empty());
    }

    #[test]
    fn navigation_after_delay() {
        let transport = FakeTransport::default()
            .reply("/listing/3/reject", Ok(HttpReply::ok(r#"{"rejected": true}"#)));
        let mut controller = controller(Variant::ToggleAndAdvance, "/listing/4", transport);
        let reject = target_button(&controller, Target::Reject);

        controller.click(reject);
        assert!(controller.wait_idle(Duration::from_secs(5)));
        let now = Instant::now();
        controller.pump(now);
        assert_eq!(controller.take_navigation(), None);

        controller.pump(now + NAVIGATION_DELAY);
        assert_eq!(controller.take_navigation(), Some("/listing/4".to_string()));
        assert_eq!(controller.take_navigation(), None);
    }

    #[test]
    fn unknown_button_is_ignored() {
        let mut controller = controller(Variant::RemoveRow, "", FakeTransport::default());
        let row = controller.document().find_by_id("listing-3").unwrap();
        let event = controller.click(row);
        assert!(event.default_prevented());
        assert_eq!(controller.in_flight(), 0);
    }
}
