//! The globe widget: state, input handling and painting.
//!
//! [`Globe`] owns every piece of mutable view state. Hosts feed it input
//! events and display-frame callbacks; any change that affects the picture
//! requests a redraw, and [`Globe::frame`] paints at most once per request
//! burst.

use crate::config::GlobeConfig;
use crate::country::{CountryInfo, FeatureId};
use crate::dialog::{CountryDetails, DialogState};
use crate::frame::{Frame, FrameScheduler};
use crate::hit_test::{HoverState, Tooltip, TooltipText};
use crate::i18n::{Catalog, Direction, Locale, TranslationPolicy};
use crate::interaction::{InteractionController, Mode, RotationState, ZoomState};
use crate::loader::World;
use crate::policy::PolicyTable;
use crate::projection::{Projection, Viewport};
use crate::render::{Highlight, Scene};
use crate::search::{search, Notification, SearchOutcome};

pub struct Globe {
    config: GlobeConfig,
    catalog: Catalog,
    locale: Locale,
    policy: TranslationPolicy,
    viewport: Viewport,
    controller: InteractionController,
    scheduler: FrameScheduler,
    last_frame: Option<Frame>,
    world: Option<World>,
    policies: PolicyTable,
    /// Last pointer position over the widget.
    pointer: Option<(f64, f64)>,
    hover: HoverState,
    selected: Option<FeatureId>,
    dialog: DialogState,
    /// Feature whose details were requested before the data arrived.
    pending_details: Option<FeatureId>,
    shown_details: Option<FeatureId>,
    notification: Option<Notification>,
}

impl Globe {
    /// Build a globe for `width` pixels. Fails if `config` does not validate.
    pub fn new(config: GlobeConfig, catalog: Catalog, width: f64) -> anyhow::Result<Self> {
        config.validate()?;
        let mut scheduler = FrameScheduler::new();
        scheduler.request();
        Ok(Self {
            viewport: Viewport::for_width(width, &config.view),
            controller: InteractionController::new(&config.view),
            locale: config.locale.default,
            policy: TranslationPolicy::from_strict(config.locale.strict),
            scheduler,
            last_frame: None,
            world: None,
            policies: PolicyTable::default(),
            pointer: None,
            hover: HoverState::default(),
            selected: None,
            dialog: DialogState::Closed,
            pending_details: None,
            shown_details: None,
            notification: None,
            catalog,
            config,
        })
    }

    fn request_redraw(&mut self) {
        self.scheduler.request();
    }

    /// Install loaded data. Ignored once the globe has been torn down.
    pub fn apply_world(&mut self, world: World) -> bool {
        if self.is_torn_down() {
            log::debug!("discarding map data that arrived after teardown");
            return false;
        }
        if !world.is_ready() {
            log::warn!("map data has no boundaries; globe stays in the loading state");
        }
        self.policies = PolicyTable::resolve(&self.config.overrides, &world.features);
        log::debug!("{} highlight policies resolved", self.policies.len());
        self.hover.retain(&world.features);
        if self
            .selected
            .as_ref()
            .is_some_and(|id| !world.features.contains(id))
        {
            self.selected = None;
        }
        self.world = Some(world);

        if let Some(id) = self.pending_details.take() {
            self.open_details(&id);
        }
        self.refresh_hover();
        self.request_redraw();
        true
    }

    pub fn is_ready(&self) -> bool {
        self.world.as_ref().is_some_and(World::is_ready)
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    fn ready_world(&self) -> Option<&World> {
        self.world.as_ref().filter(|w| w.is_ready())
    }

    // -----------------------------------------------------------------------
    // View state
    // -----------------------------------------------------------------------

    pub fn projection(&self) -> Projection {
        Projection::new(
            self.controller.rotation(),
            self.controller.zoom(),
            self.viewport,
            &self.config.view,
        )
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn rotation(&self) -> RotationState {
        self.controller.rotation()
    }

    pub fn zoom(&self) -> ZoomState {
        self.controller.zoom()
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    /// Resize to a new available width. Rotation and zoom are kept.
    pub fn resize(&mut self, width: f64) {
        let viewport = Viewport::for_width(width, &self.config.view);
        if viewport != self.viewport {
            self.viewport = viewport;
            self.refresh_hover();
            self.request_redraw();
        }
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.controller.set_reduced_motion(reduced);
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Re-test the hover at the last pointer position. Returns `true` when
    /// the tooltip needs repainting.
    fn refresh_hover(&mut self) -> bool {
        let Some(pointer) = self.pointer else {
            return false;
        };
        let projection = self.projection();
        let Some(world) = self.world.as_ref().filter(|w| w.is_ready()) else {
            return false;
        };
        let before = self.hover.cursor();
        let changed = self.hover.update(&projection, &world.features, pointer);
        changed || (self.hover.hovered().is_some() && before != self.hover.cursor())
    }

    pub fn pointer_down(&mut self, pos: (f64, f64)) {
        self.pointer = Some(pos);
        self.controller.pointer_down(pos);
    }

    /// Drag rotation and hover hit testing. Returns whether a redraw was requested.
    pub fn pointer_move(&mut self, pos: (f64, f64)) -> bool {
        self.pointer = Some(pos);
        let rotated = self.controller.pointer_move(pos);
        let hover = self.refresh_hover();
        if rotated || hover {
            self.request_redraw();
        }
        rotated || hover
    }

    pub fn pointer_up(&mut self) {
        self.controller.pointer_up();
    }

    /// The pointer left the widget: hover and tooltip are cleared.
    pub fn pointer_leave(&mut self) -> bool {
        self.pointer = None;
        let cleared = self.hover.clear();
        if cleared {
            self.request_redraw();
        }
        cleared
    }

    pub fn wheel(&mut self, delta_y: f64) -> bool {
        let zoomed = self.controller.wheel(delta_y);
        if zoomed {
            self.refresh_hover();
            self.request_redraw();
        }
        zoomed
    }

    /// Advance the clock by `dt_ms` (auto-rotation, zoom settling).
    pub fn tick(&mut self, dt_ms: f64) -> bool {
        let moved = self.controller.tick(dt_ms);
        if moved {
            self.refresh_hover();
            self.request_redraw();
        }
        moved
    }

    pub fn hovered(&self) -> Option<&FeatureId> {
        self.hover.hovered()
    }

    pub fn selected(&self) -> Option<&FeatureId> {
        self.selected.as_ref()
    }

    fn text(&self) -> TooltipText<'_> {
        TooltipText {
            catalog: &self.catalog,
            locale: self.locale,
            policy: self.policy,
        }
    }

    pub fn tooltip(&self) -> Option<Tooltip> {
        let world = self.ready_world()?;
        let feature = world.features.get(self.hover.hovered()?)?;
        let cursor = self.hover.cursor()?;
        self.text()
            .tooltip(feature, world.info.resolve(feature), cursor)
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Look a country up by name. A hit selects the country and turns the
    /// globe to face it. Blank input does nothing and returns `None`.
    pub fn search(&mut self, query: &str) -> Option<Notification> {
        let empty = World::default();
        let world = self.ready_world().unwrap_or(&empty);
        let outcome = search(query, &world.features, &world.info, &self.catalog)?;

        let focus = outcome
            .feature()
            .and_then(|id| world.features.get(id))
            .map(|f| (f.id.clone(), f.geometry.focus()));
        match (&outcome, focus) {
            (SearchOutcome::Found { .. }, Some((id, focus))) => {
                log::info!("search {query:?}: selecting {id}");
                if let Some(p) = focus {
                    self.controller.center_on(p.lon, p.lat);
                }
                self.selected = Some(id);
                self.refresh_hover();
                self.request_redraw();
            }
            (SearchOutcome::Found { name, .. }, None) => {
                log::info!("search {query:?}: {name} has no boundary on the map");
            }
            (SearchOutcome::NotFound { .. }, _) => {
                log::info!("search {query:?}: no match");
            }
        }

        let notification = Notification::for_outcome(&outcome, &self.catalog, self.locale);
        self.notification = Some(notification.clone());
        Some(notification)
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }

    // -----------------------------------------------------------------------
    // Locale
    // -----------------------------------------------------------------------

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn direction(&self) -> Direction {
        self.locale.direction()
    }

    /// Label for the language toggle: the name of the other language.
    pub fn toggle_label(&self) -> &str {
        self.catalog.t(self.locale, "language.switch")
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Switch the UI language. Loaded data is kept; only text is redone.
    pub fn set_locale(&mut self, locale: Locale) -> bool {
        if locale == self.locale {
            return false;
        }
        log::info!("locale {} -> {}", self.locale, locale);
        self.locale = locale;
        if let Some(id) = self.dialog_feature() {
            self.open_details(&id);
        }
        self.request_redraw();
        true
    }

    pub fn toggle_locale(&mut self) -> Direction {
        self.set_locale(self.locale.toggled());
        self.direction()
    }

    // -----------------------------------------------------------------------
    // Detail dialog
    // -----------------------------------------------------------------------

    fn dialog_feature(&self) -> Option<FeatureId> {
        if !self.dialog.is_open() {
            return None;
        }
        self.pending_details.clone().or_else(|| self.shown_details.clone())
    }

    /// Open the detail panel for a feature. Before the data has arrived the
    /// panel shows a loading state and fills in once it does.
    pub fn open_details(&mut self, id: &FeatureId) -> &DialogState {
        let Some(world) = self.ready_world() else {
            self.pending_details = Some(id.clone());
            self.dialog = DialogState::Loading;
            return &self.dialog;
        };
        let Some(feature) = world.features.get(id) else {
            log::debug!("no feature {id} to describe");
            return &self.dialog;
        };
        let fallback;
        let info = match world.info.resolve(feature) {
            Some(info) => info,
            None => {
                fallback = CountryInfo {
                    name: feature.name.clone(),
                    code: feature.id.code(),
                    ..Default::default()
                };
                &fallback
            }
        };
        let mut details = CountryDetails::new(info, &self.catalog, self.locale, self.policy);
        if info.name != feature.name {
            // Display names may have been substituted after loading.
            details.title = self
                .catalog
                .country(self.locale, &feature.name, self.policy)
                .map_or_else(|| feature.name.clone(), |n| n.into_owned());
        }
        self.dialog = DialogState::Open(Box::new(details));
        self.pending_details = None;
        self.shown_details = Some(id.clone());
        &self.dialog
    }

    pub fn close_details(&mut self) {
        self.dialog = DialogState::Closed;
        self.pending_details = None;
        self.shown_details = None;
    }

    pub fn dialog(&self) -> &DialogState {
        &self.dialog
    }

    // -----------------------------------------------------------------------
    // Painting
    // -----------------------------------------------------------------------

    /// Paint the current state.
    pub fn render(&self) -> Scene {
        let projection = self.projection();
        let size = (self.viewport.width, self.viewport.height);
        let title = self.catalog.t(self.locale, "globe.title");
        match self.ready_world() {
            Some(world) => Scene::paint(
                &projection,
                size,
                self.direction(),
                title,
                &world.features,
                Highlight {
                    policies: &self.policies,
                    hovered: self.hover.hovered(),
                    selected: self.selected.as_ref(),
                },
                self.tooltip(),
            ),
            None => Scene::loading(
                &projection,
                size,
                self.direction(),
                title,
                self.catalog.t(self.locale, "globe.loading"),
            ),
        }
    }

    /// Display-frame callback: paints if a redraw was requested since the
    /// last frame.
    pub fn frame(&mut self) -> Option<Scene> {
        let frame = self.scheduler.take()?;
        log::trace!("painting frame {}", frame.index);
        self.last_frame = Some(frame);
        Some(self.render())
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.last_frame
    }

    pub fn redraw_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Stop the frame loop. Later data and frame callbacks are ignored.
    pub fn teardown(&mut self) {
        log::debug!("globe teardown");
        self.scheduler.cancel();
        self.pointer = None;
        self.hover.clear();
    }

    pub fn is_torn_down(&self) -> bool {
        self.scheduler.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LonLat;
    use crate::loader::tests::{config, metadata, topology, FakeSource, METADATA, TOPOLOGY};
    use crate::loader::load;
    use crate::render::PathStyle;
    use crate::search::NotificationKind;

    fn still_config() -> GlobeConfig {
        let mut config = config();
        config.view.reduced_motion = true;
        config.view.initial_pitch = 0.0;
        config
    }

    fn world(with_metadata: bool) -> World {
        let mut source = FakeSource::default().with(TOPOLOGY, topology());
        if with_metadata {
            source = source.with(METADATA, metadata());
        }
        load(&source, &still_config())
    }

    fn globe(locale: Locale, with_metadata: bool) -> Globe {
        let mut config = still_config();
        config.locale.default = locale;
        let mut globe = Globe::new(config, Catalog::builtin(), 800.0).unwrap();
        assert!(globe.apply_world(world(with_metadata)));
        globe
    }

    fn screen(globe: &Globe, lon: f64, lat: f64) -> (f64, f64) {
        globe.projection().project(LonLat::new(lon, lat)).unwrap()
    }

    #[test]
    fn first_frame_shows_loading_until_data_arrives() {
        let mut globe = Globe::new(still_config(), Catalog::builtin(), 800.0).unwrap();
        assert!(!globe.is_ready());
        let scene = globe.frame().unwrap();
        assert_eq!(scene.placeholder.as_deref(), Some("تحميل الخريطة..."));
        assert!(scene.countries.is_empty());
        assert!(globe.frame().is_none());

        globe.apply_world(world(true));
        let scene = globe.frame().unwrap();
        assert!(scene.placeholder.is_none());
        assert_eq!(scene.countries.len(), 2);
        assert_eq!(globe.last_frame(), Some(Frame { index: 1 }));
    }

    #[test]
    fn hovering_france_shows_its_tooltip() {
        let mut globe = globe(Locale::En, true);
        let pos = screen(&globe, 5.0, 45.0);
        assert!(globe.pointer_move(pos));
        assert_eq!(globe.hovered(), Some(&FeatureId::Code(250)));

        let tip = globe.tooltip().unwrap();
        assert_eq!(tip.name, "France");
        assert_eq!(tip.capital, "Paris");
        assert_eq!(tip.population, "67,391,582");
        assert_eq!((tip.x, tip.y), (pos.0 + 12.0, pos.1 + 12.0));

        let scene = globe.frame().unwrap();
        assert_eq!(scene.country(&FeatureId::Code(250)).unwrap().style, PathStyle::Hovered);
        assert!(scene.tooltip.is_some());

        assert!(globe.pointer_leave());
        assert!(globe.tooltip().is_none());
        assert!(globe.frame().unwrap().tooltip.is_none());
    }

    #[test]
    fn hovering_the_ocean_or_space_shows_nothing() {
        let mut globe = globe(Locale::En, true);
        assert!(!globe.pointer_move(screen(&globe, -30.0, -30.0)));
        assert!(globe.tooltip().is_none());
        assert!(!globe.pointer_move((1.0, 1.0)));
        assert!(globe.hovered().is_none());
    }

    #[test]
    fn failed_metadata_shows_unknown_capital() {
        let mut globe = globe(Locale::En, false);
        globe.pointer_move(screen(&globe, 5.0, 45.0));
        let tip = globe.tooltip().unwrap();
        assert_eq!(tip.name, "France");
        assert_eq!(tip.capital, "Unknown");
        assert_eq!(tip.population, "Unknown");
    }

    #[test]
    fn search_selects_and_centers() {
        let mut globe = globe(Locale::En, true);
        globe.frame();
        let note = globe.search("Yemen").unwrap();
        assert_eq!(note.kind, NotificationKind::Found);
        assert_eq!(note.message, "Found Yemen");
        assert_eq!(globe.selected(), Some(&FeatureId::Code(887)));

        let rotation = globe.rotation();
        assert!((rotation.yaw + 45.0).abs() < 1e-6);
        assert!((rotation.pitch + 15.0).abs() < 0.5);

        let scene = globe.frame().unwrap();
        assert_eq!(scene.country(&FeatureId::Code(887)).unwrap().style, PathStyle::Selected);
        assert_eq!(globe.notification(), Some(&note));
    }

    #[test]
    fn failed_search_changes_nothing() {
        let mut globe = globe(Locale::En, true);
        globe.frame();
        let before = globe.rotation();
        let note = globe.search("Atlantis").unwrap();
        assert_eq!(note.kind, NotificationKind::NotFound);
        assert_eq!(globe.selected(), None);
        assert_eq!(globe.rotation(), before);
        assert!(globe.frame().is_none());
        assert!(globe.search("  ").is_none());
    }

    #[test]
    fn failed_search_keeps_the_previous_selection() {
        let mut globe = globe(Locale::En, true);
        globe.search("Yemen").unwrap();
        globe.frame();
        let before = globe.rotation();

        let note = globe.search("Atlantis").unwrap();
        assert_eq!(note.kind, NotificationKind::NotFound);
        assert_eq!(globe.selected(), Some(&FeatureId::Code(887)));
        assert_eq!(globe.rotation(), before);
        assert!(globe.frame().is_none());
        let scene = globe.render();
        assert_eq!(scene.country(&FeatureId::Code(887)).unwrap().style, PathStyle::Selected);
    }

    #[test]
    fn invalid_view_ranges_are_rejected() {
        let config: GlobeConfig = serde_json::from_str(r#"{ "view": { "min_zoom": 4.0 } }"#).unwrap();
        assert!(Globe::new(config, Catalog::builtin(), 800.0).is_err());
        let config: GlobeConfig =
            serde_json::from_str(r#"{ "view": { "min_height": 900.0, "max_height": 400.0 } }"#).unwrap();
        assert!(Globe::new(config, Catalog::builtin(), 800.0).is_err());
    }

    #[test]
    fn renamed_codeless_country_keeps_its_details() {
        let topology = serde_json::json!({
            "type": "Topology",
            "arcs": [[[20, 40], [22, 40], [22, 43], [20, 43], [20, 40]]],
            "objects": { "countries": { "type": "GeometryCollection", "geometries": [
                { "type": "Polygon", "arcs": [[0]], "properties": { "name": "Kosovo" } }
            ] } }
        });
        let metadata = serde_json::json!([
            { "name": { "common": "Kosovo" }, "capital": ["Pristina"], "region": "Europe" }
        ]);
        let source = FakeSource::default()
            .with(TOPOLOGY, topology.to_string())
            .with(METADATA, metadata.to_string());
        let mut config = still_config();
        config.locale.default = Locale::En;
        config.overrides.names.insert("Kosovo".into(), "Kosova".into());
        config.overrides.pinned.push("Kosovo".into());
        let world = load(&source, &config);

        let mut globe = Globe::new(config, Catalog::builtin(), 800.0).unwrap();
        assert!(globe.apply_world(world));
        globe.pointer_move(screen(&globe, 21.0, 41.5));
        let tip = globe.tooltip().unwrap();
        assert_eq!(tip.name, "Kosova");
        assert_eq!(tip.capital, "Pristina");
        let id = FeatureId::Name("Kosovo".into());
        assert_eq!(globe.render().country(&id).unwrap().style, PathStyle::Pinned);
    }

    #[test]
    fn arabic_search_input() {
        let mut globe = globe(Locale::Ar, true);
        let note = globe.search("اليمن").unwrap();
        assert_eq!(note.message, "تم العثور على اليمن");
        assert_eq!(globe.selected(), Some(&FeatureId::Code(887)));
    }

    #[test]
    fn toggling_locale_rewords_without_reloading() {
        let mut globe = globe(Locale::Ar, true);
        assert_eq!(globe.toggle_label(), "English");
        globe.pointer_move(screen(&globe, 5.0, 45.0));
        let tip = globe.tooltip().unwrap();
        assert_eq!(tip.name, "فرنسا");
        assert_eq!(tip.capital, "باريس");
        assert_eq!(tip.direction, Direction::Rtl);
        globe.frame();

        assert_eq!(globe.toggle_locale(), Direction::Ltr);
        assert_eq!(globe.locale(), Locale::En);
        assert_eq!(globe.toggle_label(), "العربية");
        let tip = globe.tooltip().unwrap();
        assert_eq!(tip.name, "France");
        assert_eq!(tip.capital_label, "Capital");
        assert_eq!(globe.hovered(), Some(&FeatureId::Code(250)));
        assert_eq!(globe.world().unwrap().features.len(), 2);
        assert_eq!(globe.frame().unwrap().direction, Direction::Ltr);
        assert!(!globe.set_locale(Locale::En));
    }

    #[test]
    fn redraw_requests_coalesce() {
        let mut globe = globe(Locale::En, true);
        globe.frame();
        globe.pointer_down((400.0, 260.0));
        assert!(globe.pointer_move((410.0, 260.0)));
        assert!(globe.pointer_move((420.0, 262.0)));
        globe.pointer_up();
        assert!(globe.wheel(-100.0));
        assert!(globe.frame().is_some());
        assert!(globe.frame().is_none());
        assert!((globe.rotation().yaw - 5.0).abs() < 1e-9);
        assert!(globe.zoom().get() > 1.0);
    }

    #[test]
    fn spinning_moves_the_globe_unless_reduced_motion() {
        let mut globe = globe(Locale::En, true);
        assert!(!globe.tick(16.0));
        globe.set_reduced_motion(false);
        assert!(globe.tick(100.0));
        assert!((globe.rotation().yaw - 1.5).abs() < 1e-9);
    }

    #[test]
    fn resize_keeps_the_view() {
        let mut globe = globe(Locale::En, true);
        globe.wheel(-50.0);
        let (rotation, zoom) = (globe.rotation(), globe.zoom());
        globe.resize(1200.0);
        assert_eq!(globe.viewport(), Viewport::new(1200.0, 720.0));
        assert_eq!(globe.rotation(), rotation);
        assert_eq!(globe.zoom(), zoom);
    }

    #[test]
    fn details_wait_for_data() {
        let mut globe = Globe::new(still_config(), Catalog::builtin(), 800.0).unwrap();
        let yemen = FeatureId::Code(887);
        assert_eq!(globe.open_details(&yemen), &DialogState::Loading);
        globe.apply_world(world(true));
        let details = globe.dialog().details().unwrap();
        assert_eq!(details.title, "اليمن");
        assert_eq!(details.direction, Direction::Rtl);

        globe.set_locale(Locale::En);
        assert_eq!(globe.dialog().details().unwrap().title, "Yemen");
        globe.close_details();
        assert_eq!(globe.dialog(), &DialogState::Closed);
    }

    #[test]
    fn pinned_countries_keep_their_style_under_hover() {
        let mut config = still_config();
        config.locale.default = Locale::En;
        config.overrides.pinned.push("France".into());
        let mut globe = Globe::new(config, Catalog::builtin(), 800.0).unwrap();
        globe.apply_world(world(true));
        globe.pointer_move(screen(&globe, 5.0, 45.0));
        assert!(globe.tooltip().is_some());
        let scene = globe.frame().unwrap();
        assert_eq!(scene.country(&FeatureId::Code(250)).unwrap().style, PathStyle::Pinned);
    }

    #[test]
    fn data_after_teardown_is_discarded() {
        let mut globe = Globe::new(still_config(), Catalog::builtin(), 800.0).unwrap();
        globe.teardown();
        assert!(globe.is_torn_down());
        assert!(!globe.apply_world(world(true)));
        assert!(!globe.is_ready());
        assert!(globe.frame().is_none());
        globe.wheel(-100.0);
        assert!(globe.frame().is_none());
    }
}
