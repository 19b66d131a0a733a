use crate::api::AddressLookup;
use crate::config::Config;
use crate::events::Event;
use crate::location::DevicePosition;
use crate::models::{Coordinate, MapSelection, PickedLocation, Place, Route};
use crate::permission::PromptPermission;
use crate::picker::{locate_device, LocationPicker, Navigator, PickerListener};
use crate::error::GeoError;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

const MIN_MAP_STEP: f64 = 0.01;
const MAX_MAP_STEP: f64 = 10.0;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Screen {
    AddPlace,
    Map,
}

/// Focus ring of the "Add Place" form, in Tab order.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum FormField {
    Title,
    Locate,
    PickOnMap,
    Save,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Title => FormField::Locate,
            FormField::Locate => FormField::PickOnMap,
            FormField::PickOnMap => FormField::Save,
            FormField::Save => FormField::Title,
        }
    }

    fn prev(self) -> Self {
        match self {
            FormField::Title => FormField::Save,
            FormField::Locate => FormField::Title,
            FormField::PickOnMap => FormField::Locate,
            FormField::Save => FormField::PickOnMap,
        }
    }
}

/// Forwards picker results into the event loop.
struct FormListener(mpsc::UnboundedSender<Event>);

impl PickerListener for FormListener {
    fn on_pick_location(&self, location: PickedLocation) {
        let _ = self.0.send(Event::LocationPicked(location));
    }

    fn on_resolve_error(&self, coord: Coordinate, error: GeoError) {
        warn!("Could not resolve address for {}: {}", coord, error);
        let _ = self.0.send(Event::ResolveFailed(error.to_string()));
    }
}

impl Navigator for mpsc::UnboundedSender<Event> {
    fn navigate(&self, route: Route) {
        let _ = self.send(Event::Navigate(route));
    }
}

/// The "Add Place" form and the map selection screen.
pub struct App<L: AddressLookup> {
    pub screen: Screen,
    pub focus: FormField,
    pub title: String,
    pub picker: LocationPicker<L>,
    /// Latest location reported by the picker.
    pub picked: Option<PickedLocation>,
    pub places: Vec<Place>,
    pub status: Option<String>,
    pub locating: bool,
    pub should_quit: bool,

    // Map screen
    pub map_cursor: Coordinate,
    pub map_step: f64,

    /// Pending permission dialog; answering consumes it.
    pub permission_prompt: Option<oneshot::Sender<bool>>,

    permissions: Arc<PromptPermission>,
    positions: Arc<DevicePosition>,
    tx: mpsc::UnboundedSender<Event>,
}

impl<L> App<L>
where
    L: AddressLookup + Send + Sync + 'static,
{
    pub fn new(config: &Config, lookup: Arc<L>, tx: mpsc::UnboundedSender<Event>) -> Self {
        let picker = LocationPicker::new(
            config.location.default_coordinate(),
            config.maps.clone(),
            lookup,
            Arc::new(FormListener(tx.clone())),
        );

        Self {
            screen: Screen::AddPlace,
            focus: FormField::Title,
            title: String::new(),
            picker,
            picked: None,
            places: Vec::new(),
            status: None,
            locating: false,
            should_quit: false,
            map_cursor: Coordinate::UNSET,
            map_step: config.ui.map_step_degrees.clamp(MIN_MAP_STEP, MAX_MAP_STEP),
            permission_prompt: None,
            permissions: Arc::new(PromptPermission::new(config.location.permission, tx.clone())),
            positions: Arc::new(DevicePosition::from_config(&config.location)),
            tx,
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Tick => {}
            Event::Input(key) => self.handle_key(key),
            Event::LocationPicked(location) => {
                info!("Picked location: {:?}", location);
                self.picked = Some(location);
                self.status = None;
            }
            Event::ResolveFailed(msg) => self.status = Some(msg),
            Event::Located(result) => {
                self.locating = false;
                match result {
                    Ok(Some(coord)) => {
                        self.picker.set_location(coord);
                    }
                    // Permission refused; nothing to report.
                    Ok(None) => {}
                    Err(msg) => self.status = Some(msg),
                }
            }
            Event::Navigate(route) => self.navigate(route),
            Event::PermissionPrompt(reply) => self.permission_prompt = Some(reply),
        }
    }

    fn navigate(&mut self, route: Route) {
        match route {
            Route::AddPlace(params) => {
                self.screen = Screen::AddPlace;
                self.picker.on_focus(true, params);
            }
            Route::Map => {
                self.screen = Screen::Map;
                self.map_cursor = self.picker.current();
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        // The permission dialog is modal.
        if self.permission_prompt.is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.answer_permission(true),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.answer_permission(false),
                _ => {}
            }
            return;
        }

        match self.screen {
            Screen::AddPlace => self.handle_form_key(key),
            Screen::Map => self.handle_map_key(key),
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.quit(),
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Enter => match self.focus {
                FormField::Title => self.focus = self.focus.next(),
                FormField::Locate => self.start_locate(),
                FormField::PickOnMap => self.picker.pick_on_map(&self.tx),
                FormField::Save => self.save(),
            },
            KeyCode::Backspace if self.focus == FormField::Title => {
                self.title.pop();
            }
            KeyCode::Char(c) if self.focus == FormField::Title => self.title.push(c),
            _ => {}
        }
    }

    fn handle_map_key(&mut self, key: KeyEvent) {
        let step = self.map_step;
        match key.code {
            KeyCode::Up => self.move_cursor(step, 0.0),
            KeyCode::Down => self.move_cursor(-step, 0.0),
            KeyCode::Right => self.move_cursor(0.0, step),
            KeyCode::Left => self.move_cursor(0.0, -step),
            KeyCode::Char('+') => self.map_step = (step * 2.0).min(MAX_MAP_STEP),
            KeyCode::Char('-') => self.map_step = (step / 2.0).max(MIN_MAP_STEP),
            KeyCode::Enter => {
                let selection = MapSelection {
                    picked_lat: self.map_cursor.lat,
                    picked_lng: self.map_cursor.lng,
                };
                self.tx.navigate(Route::AddPlace(Some(selection)));
            }
            KeyCode::Esc => self.tx.navigate(Route::AddPlace(None)),
            _ => {}
        }
    }

    fn move_cursor(&mut self, dlat: f64, dlng: f64) {
        let lat = (self.map_cursor.lat + dlat).clamp(-90.0, 90.0);
        let mut lng = self.map_cursor.lng + dlng;
        if lng > 180.0 {
            lng -= 360.0;
        } else if lng < -180.0 {
            lng += 360.0;
        }
        self.map_cursor = Coordinate::new(lat, lng);
    }

    /// Runs the locate flow in the background; the result comes back as
    /// [`Event::Located`].
    fn start_locate(&mut self) {
        if self.locating {
            return;
        }
        self.locating = true;

        let permissions = Arc::clone(&self.permissions);
        let positions = Arc::clone(&self.positions);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = locate_device(&*permissions, &*positions)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(Event::Located(result));
        });
    }

    fn answer_permission(&mut self, granted: bool) {
        if let Some(reply) = self.permission_prompt.take() {
            let _ = reply.send(granted);
        }
    }

    fn save(&mut self) {
        let title = self.title.trim();
        if title.is_empty() {
            self.status = Some("Enter a title first.".to_string());
            return;
        }
        let location = match &self.picked {
            Some(loc) if loc.address.is_some() => loc.clone(),
            _ => {
                self.status = Some("Pick a location first.".to_string());
                return;
            }
        };

        let place = Place {
            title: title.to_string(),
            location,
            created_at: chrono::Local::now(),
        };
        info!("Saved place {:?}", place);
        self.status = Some(format!("Saved \"{}\".", place.title));
        self.places.push(place);
        self.title.clear();
        self.focus = FormField::Title;
    }

    pub fn quit(&mut self) {
        self.picker.teardown();
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PositionSourceKind;
    use crate::permission::PermissionStatus;
    use std::sync::Mutex;

    struct EchoLookup;

    impl AddressLookup for EchoLookup {
        async fn resolve_address(&self, coord: Coordinate) -> Result<String, GeoError> {
            if coord.lat > 80.0 {
                return Err(GeoError::NoResults);
            }
            Ok(format!("near {}", coord))
        }
    }

    /// Holds every lookup until the test releases it.
    struct GatedLookup(Mutex<Option<oneshot::Receiver<()>>>);

    impl AddressLookup for GatedLookup {
        async fn resolve_address(&self, coord: Coordinate) -> Result<String, GeoError> {
            let gate = self.0.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(format!("near {}", coord))
        }
    }

    fn test_app(permission: PermissionStatus) -> (App<EchoLookup>, mpsc::UnboundedReceiver<Event>) {
        test_app_with(permission, Arc::new(EchoLookup))
    }

    fn test_app_with<L>(permission: PermissionStatus, lookup: Arc<L>) -> (App<L>, mpsc::UnboundedReceiver<Event>)
    where
        L: AddressLookup + Send + Sync + 'static,
    {
        let mut config = Config::default();
        config.location.permission = permission;
        config.location.source = PositionSourceKind::Fixed;
        config.location.fixed_lat = 10.0;
        config.location.fixed_lng = 20.0;
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(&config, lookup, tx), rx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App<EchoLookup>, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    /// Feeds background events into the app until `done` holds.
    async fn pump_until(
        app: &mut App<EchoLookup>,
        rx: &mut mpsc::UnboundedReceiver<Event>,
        done: impl Fn(&App<EchoLookup>) -> bool,
    ) {
        while !done(app) {
            let event = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
                .await
                .expect("timed out waiting for app event")
                .expect("channel closed");
            app.handle_event(event);
        }
    }

    #[tokio::test]
    async fn focus_ring_wraps_both_ways() {
        let (mut app, _rx) = test_app(PermissionStatus::Granted);
        assert_eq!(app.focus, FormField::Title);
        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.focus, FormField::Save);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus, FormField::Title);
    }

    #[tokio::test]
    async fn map_round_trip_updates_picked_location() {
        let (mut app, mut rx) = test_app(PermissionStatus::Granted);
        app.focus = FormField::PickOnMap;
        app.handle_key(key(KeyCode::Enter));
        pump_until(&mut app, &mut rx, |a| a.screen == Screen::Map).await;
        assert_eq!(app.map_cursor, Coordinate::UNSET);

        app.handle_key(key(KeyCode::Up));
        app.handle_key(key(KeyCode::Up));
        app.handle_key(key(KeyCode::Right));
        app.handle_key(key(KeyCode::Enter));

        pump_until(&mut app, &mut rx, |a| a.picked.is_some()).await;
        assert_eq!(app.screen, Screen::AddPlace);
        assert_eq!(app.picker.current(), Coordinate::new(2.0, 1.0));
        assert_eq!(app.picked.as_ref().unwrap().address.as_deref(), Some("near 2,1"));
    }

    #[tokio::test]
    async fn cancelling_the_map_keeps_current_location() {
        let (mut app, mut rx) = test_app(PermissionStatus::Granted);
        app.handle_event(Event::Navigate(Route::Map));
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Esc));
        pump_until(&mut app, &mut rx, |a| a.screen == Screen::AddPlace).await;
        assert!(app.picker.current().is_unset());
    }

    #[tokio::test]
    async fn map_cursor_clamps_latitude_and_wraps_longitude() {
        let (mut app, _rx) = test_app(PermissionStatus::Granted);
        app.handle_event(Event::Navigate(Route::Map));
        app.map_cursor = Coordinate::new(89.5, 179.5);
        app.handle_key(key(KeyCode::Up));
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.map_cursor, Coordinate::new(90.0, -179.5));
    }

    #[tokio::test]
    async fn locate_prompts_then_adopts_fixed_position() {
        let (mut app, mut rx) = test_app(PermissionStatus::Undetermined);
        app.focus = FormField::Locate;
        app.handle_key(key(KeyCode::Enter));
        assert!(app.locating);

        pump_until(&mut app, &mut rx, |a| a.permission_prompt.is_some()).await;
        // Keys other than y/n do nothing while the dialog is up.
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus, FormField::Locate);
        app.handle_key(key(KeyCode::Char('y')));

        pump_until(&mut app, &mut rx, |a| a.picked.is_some()).await;
        assert!(!app.locating);
        assert_eq!(app.picker.current(), Coordinate::new(10.0, 20.0));
    }

    #[tokio::test]
    async fn denied_locate_does_nothing_visible() {
        let (mut app, mut rx) = test_app(PermissionStatus::Denied);
        app.focus = FormField::Locate;
        app.handle_key(key(KeyCode::Enter));

        pump_until(&mut app, &mut rx, |a| !a.locating).await;
        assert!(app.picker.current().is_unset());
        assert!(app.status.is_none());
        assert!(app.permission_prompt.is_none());
    }

    #[tokio::test]
    async fn resolve_failure_is_shown_in_status() {
        let (mut app, mut rx) = test_app(PermissionStatus::Granted);
        app.handle_event(Event::Navigate(Route::AddPlace(Some(MapSelection {
            picked_lat: 85.0,
            picked_lng: 0.0,
        }))));
        pump_until(&mut app, &mut rx, |a| a.status.is_some()).await;
        assert_eq!(app.status.as_deref(), Some("no address found for this location"));
        assert!(app.picked.is_none());
    }

    #[tokio::test]
    async fn save_needs_title_and_location() {
        let (mut app, mut rx) = test_app(PermissionStatus::Granted);
        app.focus = FormField::Save;
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.status.as_deref(), Some("Enter a title first."));

        app.title = "Red Square".into();
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.status.as_deref(), Some("Pick a location first."));

        app.handle_event(Event::Navigate(Route::AddPlace(Some(MapSelection {
            picked_lat: 55.75,
            picked_lng: 37.62,
        }))));
        pump_until(&mut app, &mut rx, |a| a.picked.is_some()).await;

        app.focus = FormField::Save;
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.places.len(), 1);
        assert_eq!(app.places[0].title, "Red Square");
        assert_eq!(app.places[0].location.lat, 55.75);
        assert!(app.title.is_empty());
        assert_eq!(app.focus, FormField::Title);
    }

    #[tokio::test]
    async fn title_editing() {
        let (mut app, _rx) = test_app(PermissionStatus::Granted);
        type_text(&mut app, "Cafe");
        app.handle_key(key(KeyCode::Backspace));
        assert_eq!(app.title, "Caf");

        // Typing while a button is focused does not edit the title.
        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "x");
        assert_eq!(app.title, "Caf");
    }

    #[tokio::test]
    async fn esc_quits_and_tears_down_picker() {
        let (release, gate) = oneshot::channel();
        let lookup = Arc::new(GatedLookup(Mutex::new(Some(gate))));
        let (mut app, mut rx) = test_app_with(PermissionStatus::Granted, lookup);

        app.handle_event(Event::Navigate(Route::AddPlace(Some(MapSelection {
            picked_lat: 48.85,
            picked_lng: 2.35,
        }))));
        // Let the lookup start and park on the gate.
        tokio::task::yield_now().await;

        app.handle_key(key(KeyCode::Esc));
        assert!(app.should_quit);

        release.send(()).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        while let Ok(event) = rx.try_recv() {
            assert!(
                !matches!(event, Event::LocationPicked(_)),
                "address delivered after quitting: {:?}",
                event
            );
        }
        assert!(app.picked.is_none());
    }
}
