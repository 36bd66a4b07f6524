//! Runtime-permission and file-chooser bridging for page requests.
//!
//! Pages ask for the camera, location or a file. Each request is either
//! answered on the spot or parked until the host reports the outcome of the
//! system dialog through `on_request_permissions_result` /
//! `on_activity_result`.

use tracing::debug;

use crate::intent::{Intent, ACTION_GET_CONTENT, CATEGORY_OPENABLE, EXTRA_ALLOW_MULTIPLE};

pub const CAMERA_REQUEST_CODE: i32 = 113;
pub const LOCATION_REQUEST_CODE: i32 = 115;
pub const FILE_PICKER_REQUEST_CODE: i32 = 51426;

pub const RESOURCE_VIDEO_CAPTURE: &str = "android.webkit.resource.VIDEO_CAPTURE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Camera,
    FineLocation,
}

/// Host-side runtime permission checks and prompts.
pub trait PermissionRequester {
    fn has_permission(&self, permission: Permission) -> bool;

    /// Show the system prompt. The answer comes back through
    /// [`PermissionBridge::on_request_permissions_result`].
    fn request_permission(&mut self, permission: Permission, request_code: i32);
}

/// A page's request for media resources.
pub trait PermissionRequest {
    fn resources(&self) -> Vec<String>;
    fn grant(&mut self, resources: &[String]);
    fn deny(&mut self);
}

pub trait GeolocationCallback {
    fn invoke(&mut self, origin: &str, allow: bool, retain: bool);
}

#[derive(Default)]
pub struct PermissionBridge {
    camera: Option<Box<dyn PermissionRequest>>,
    geolocation: Option<(String, Box<dyn GeolocationCallback>)>,
}

impl PermissionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending_camera(&self) -> bool {
        self.camera.is_some()
    }

    pub fn has_pending_geolocation(&self) -> bool {
        self.geolocation.is_some()
    }

    pub fn on_permission_request(
        &mut self,
        mut request: Box<dyn PermissionRequest>,
        host: &mut dyn PermissionRequester,
    ) {
        let resources = request.resources();
        let wants_camera = resources.iter().any(|r| r == RESOURCE_VIDEO_CAPTURE);
        if wants_camera && !host.has_permission(Permission::Camera) {
            debug!("parking camera request until the user answers");
            self.camera = Some(request);
            host.request_permission(Permission::Camera, CAMERA_REQUEST_CODE);
        } else {
            request.grant(&resources);
        }
    }

    pub fn on_geolocation_prompt(
        &mut self,
        origin: &str,
        mut callback: Box<dyn GeolocationCallback>,
        host: &mut dyn PermissionRequester,
    ) {
        if host.has_permission(Permission::FineLocation) {
            callback.invoke(origin, true, false);
        } else {
            self.geolocation = Some((origin.to_string(), callback));
            host.request_permission(Permission::FineLocation, LOCATION_REQUEST_CODE);
        }
    }

    pub fn on_request_permissions_result(&mut self, request_code: i32, granted: bool) {
        match request_code {
            CAMERA_REQUEST_CODE => {
                if let Some(mut request) = self.camera.take() {
                    if granted {
                        let resources = request.resources();
                        request.grant(&resources);
                    } else {
                        request.deny();
                    }
                }
            }
            LOCATION_REQUEST_CODE => {
                if let Some((origin, mut callback)) = self.geolocation.take() {
                    callback.invoke(&origin, granted, false);
                }
            }
            _ => {}
        }
    }
}

/// Starts an activity whose result comes back later.
pub trait ResultLauncher {
    fn start_for_result(&mut self, intent: &Intent, request_code: i32, chooser_title: &str);
}

pub type FileCallback = Box<dyn FnOnce(Option<Vec<String>>)>;

/// What the picker activity returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChooserResult {
    pub data: Option<String>,
    pub clip: Vec<String>,
}

pub struct FileChooser {
    accept: String,
    title: String,
    pending: Option<FileCallback>,
}

impl Default for FileChooser {
    fn default() -> Self {
        Self {
            accept: "*/*".to_string(),
            title: "Choose a file".to_string(),
            pending: None,
        }
    }
}

impl FileChooser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_uploadable_file_types(&mut self, mime_type: impl Into<String>) {
        self.accept = mime_type.into();
    }

    pub fn set_prompt_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Any callback still waiting is answered with `None` first.
    pub fn open(&mut self, callback: FileCallback, allow_multiple: bool, launcher: &mut dyn ResultLauncher) {
        if let Some(previous) = self.pending.take() {
            previous(None);
        }
        self.pending = Some(callback);

        let mut intent = Intent::new(ACTION_GET_CONTENT);
        intent.add_category(CATEGORY_OPENABLE);
        intent.mime_type = Some(self.accept.clone());
        if allow_multiple {
            intent.put_extra(EXTRA_ALLOW_MULTIPLE, "true");
        }
        launcher.start_for_result(&intent, FILE_PICKER_REQUEST_CODE, &self.title);
    }

    pub fn on_activity_result(&mut self, request_code: i32, ok: bool, result: Option<ChooserResult>) {
        if request_code != FILE_PICKER_REQUEST_CODE {
            return;
        }
        let Some(callback) = self.pending.take() else {
            return;
        };
        let uris = match (ok, result) {
            (true, Some(ChooserResult { data: Some(uri), .. })) => Some(vec![uri]),
            (true, Some(ChooserResult { clip, .. })) if !clip.is_empty() => Some(clip),
            _ => None,
        };
        callback(uris);
    }
}
