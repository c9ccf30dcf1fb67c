//! Plugin registry: static registration, dynamic loading and the
//! start/finish lifecycle of network plugins.

use crate::error::PluginSystemError;
use disgate_protocol::{AdaptorId, LocalMessageType, NetworkPlugin, PduType, PluginContext, PluginError};
use libloading::{Library, Symbol};
use std::ffi::CStr;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Configuration for plugin loading safety checks.
///
/// These flags allow users to override safety validations when they understand the risks.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PluginSafetyConfig {
    /// Ignore Rust compiler version differences between plugin and host.
    /// WARNING: This may cause crashes due to ABI incompatibilities.
    pub allow_unsafe_plugins: bool,

    /// Ignore crate version differences between plugin and host.
    /// WARNING: This may cause crashes or undefined behavior.
    pub allow_abi_mismatch: bool,

    /// Require exact version matching including patch digits.
    /// When false, only major.minor must match (ignoring patch).
    pub strict_versioning: bool,
}

/// Where a plugin came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    /// Linked into the host binary
    Static,
    /// Loaded from a dynamic library
    Dynamic(PathBuf),
}

impl fmt::Display for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginSource::Static => f.write_str("static"),
            PluginSource::Dynamic(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Description of a registered plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginHandle {
    pub name: String,
    pub version: String,
    pub source: PluginSource,
}

/// A registered plugin. `plugin` is declared before `library` so the
/// instance is dropped before its code is unmapped.
struct LoadedPlugin {
    handle: PluginHandle,
    plugin: Box<dyn NetworkPlugin>,
    library: Option<Library>,
    started: bool,
    /// Adaptors this plugin registered during `start`
    incoming_added: Vec<(PduType, AdaptorId)>,
    outgoing_added: Vec<(LocalMessageType, AdaptorId)>,
}

impl LoadedPlugin {
    /// Drops the instance, then releases its library.
    fn unload(self) {
        let LoadedPlugin { handle, plugin, library, .. } = self;
        drop(plugin);

        let Some(library) = library else {
            return;
        };

        // On Windows, unloading a library that still has live references
        // can cause access violations, so it is opt-in there.
        #[cfg(windows)]
        let should_unload_library = std::env::var("DISGATE_UNLOAD_PLUGIN_LIBRARIES")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        #[cfg(not(windows))]
        let should_unload_library = true;

        if should_unload_library {
            info!("📚 Unloading library for plugin: {}", handle.name);
            drop(library);
        } else {
            info!("📚 Keeping library of {} mapped (set DISGATE_UNLOAD_PLUGIN_LIBRARIES=true to unload)", handle.name);
            std::mem::forget(library);
        }
    }
}

/// Owns every plugin of one dispatch component, in registration order.
///
/// The registry handles:
/// - Statically linked plugins registered by the host
/// - Discovery and loading of dynamic libraries from a directory
/// - ABI version validation before any plugin code runs
/// - Panic isolation around `start` and `finish`
/// - Reverse-order teardown
pub struct PluginRegistry {
    plugins: Vec<LoadedPlugin>,
    safety_config: PluginSafetyConfig,
    whitelist: Option<Vec<String>>,
}

impl PluginRegistry {
    pub fn new(safety_config: PluginSafetyConfig) -> Self {
        Self { plugins: Vec::new(), safety_config, whitelist: None }
    }

    /// Restricts directory loading to libraries whose name (without any
    /// `lib` prefix and extension) appears in `names`.
    pub fn with_whitelist(mut self, names: Vec<String>) -> Self {
        self.whitelist = Some(names);
        self
    }

    /// Registers a plugin linked into the host.
    pub fn register_static(&mut self, plugin: Box<dyn NetworkPlugin>) -> Result<PluginHandle, PluginSystemError> {
        self.insert(plugin, None, PluginSource::Static)
    }

    /// Loads every plugin library found in `plugin_directory`.
    ///
    /// A missing directory is not an error. Libraries that fail to load are
    /// logged and skipped. Returns the number of plugins loaded.
    pub fn load_plugins_from_directory<P: AsRef<Path>>(&mut self, plugin_directory: P) -> Result<usize, PluginSystemError> {
        let dir_path = plugin_directory.as_ref();

        if !dir_path.exists() {
            warn!("Plugin directory does not exist: {}", dir_path.display());
            return Ok(0);
        }

        if !dir_path.is_dir() {
            return Err(PluginSystemError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("Plugin path is not a directory: {}", dir_path.display()),
            )));
        }

        info!("🔌 Loading plugins from: {}", dir_path.display());

        let plugin_files = discover_plugin_files(dir_path)?;
        if plugin_files.is_empty() {
            info!("📂 No plugin files found in directory");
            return Ok(0);
        }

        info!("🔍 Found {} plugin file(s)", plugin_files.len());
        let plugin_count = plugin_files.len();

        let mut loaded_count = 0;
        for plugin_file in &plugin_files {
            if !self.is_whitelisted(plugin_file) {
                info!("⏭️ Skipping plugin not in whitelist: {}", plugin_file.display());
                continue;
            }
            match self.load_plugin(plugin_file) {
                Ok(handle) => {
                    info!("✅ Successfully loaded plugin: {} v{}", handle.name, handle.version);
                    loaded_count += 1;
                }
                Err(e) => {
                    error!("❌ Failed to load plugin from {}: {}", plugin_file.display(), e);
                }
            }
        }

        info!("🎉 Plugin loading complete: {}/{} plugins loaded successfully", loaded_count, plugin_count);
        Ok(loaded_count)
    }

    /// Loads a single plugin library.
    pub fn load_plugin<P: AsRef<Path>>(&mut self, plugin_path: P) -> Result<PluginHandle, PluginSystemError> {
        let path = plugin_path.as_ref();
        info!("🔄 Loading plugin from: {}", path.display());

        // SAFETY: loading a library runs its initializers; plugin directories are operator-controlled.
        let library = unsafe {
            Library::new(path).map_err(|e| PluginSystemError::LibraryError(format!("Failed to load library: {}", e)))?
        };

        let plugin_version = {
            // SAFETY: the symbol type matches what `export_plugin!` generates.
            let get_plugin_version: Symbol<unsafe extern "C" fn() -> *const std::os::raw::c_char> = unsafe {
                library.get(b"get_plugin_version").map_err(|e| {
                    PluginSystemError::LoadingError(format!("Plugin does not export 'get_plugin_version' function: {}", e))
                })?
            };

            let version_ptr = unsafe { get_plugin_version() };
            if version_ptr.is_null() {
                return Err(PluginSystemError::LoadingError("Plugin returned null version string".to_string()));
            }
            // SAFETY: `export_plugin!` returns a pointer to a static NUL-terminated string.
            unsafe { CStr::from_ptr(version_ptr) }.to_string_lossy().into_owned()
        };

        self.validate_plugin_compatibility(&plugin_version, disgate_protocol::ABI_VERSION)?;

        let plugin = {
            let create_plugin: Symbol<unsafe extern "C" fn() -> *mut dyn NetworkPlugin> = unsafe {
                library.get(b"create_plugin").map_err(|e| {
                    PluginSystemError::LoadingError(format!("Plugin does not export 'create_plugin' function: {}", e))
                })?
            };

            let plugin_ptr = unsafe { create_plugin() };
            if plugin_ptr.is_null() {
                return Err(PluginSystemError::LoadingError("Plugin creation function returned null".to_string()));
            }
            // SAFETY: ownership of the box is transferred by `create_plugin`.
            unsafe { Box::from_raw(plugin_ptr) }
        };

        self.insert(plugin, Some(library), PluginSource::Dynamic(path.to_path_buf()))
    }

    fn insert(
        &mut self,
        plugin: Box<dyn NetworkPlugin>,
        library: Option<Library>,
        source: PluginSource,
    ) -> Result<PluginHandle, PluginSystemError> {
        let name = plugin.name().to_string();
        if self.is_plugin_loaded(&name) {
            // the instance must go before its library
            drop(plugin);
            drop(library);
            return Err(PluginSystemError::PluginAlreadyExists(name));
        }

        let handle = PluginHandle { name, version: plugin.version().to_string(), source };
        self.plugins.push(LoadedPlugin {
            handle: handle.clone(),
            plugin,
            library,
            started: false,
            incoming_added: Vec::new(),
            outgoing_added: Vec::new(),
        });
        Ok(handle)
    }

    /// Starts every registered plugin that has not been started yet.
    ///
    /// A plugin whose `start` fails or panics is unloaded and skipped; the
    /// remaining plugins still start. Adaptors it registered before failing
    /// are unregistered before its library goes away. Returns the number
    /// started by this call.
    pub fn start_all(&mut self, ctx: &mut PluginContext<'_>) -> usize {
        info!("🔧 Starting {} registered plugins", self.plugins.len());

        let mut started = 0;
        let mut failed = Vec::new();
        for (index, loaded) in self.plugins.iter_mut().enumerate() {
            if loaded.started {
                continue;
            }

            let incoming_before = ctx.incoming.registrations();
            let outgoing_before = ctx.outgoing.registrations();

            let result = catch_unwind(AssertUnwindSafe(|| loaded.plugin.start(ctx))).unwrap_or_else(|panic| Err(PluginError::from_panic(panic)));

            match result {
                Ok(()) => {
                    info!("✅ Plugin started: {} ({})", loaded.handle.name, loaded.handle.source);
                    loaded.started = true;
                    loaded.incoming_added = added_since(ctx.incoming.registrations(), &incoming_before);
                    loaded.outgoing_added = added_since(ctx.outgoing.registrations(), &outgoing_before);
                    started += 1;
                }
                Err(e) => {
                    error!("❌ Plugin {} failed to start, unloading it: {}", loaded.handle.name, e);
                    let leftover = ctx.incoming.retain_adaptors(&incoming_before) + ctx.outgoing.retain_adaptors(&outgoing_before);
                    if leftover > 0 {
                        warn!("🧹 Removed {} adaptor(s) left behind by {}", leftover, loaded.handle.name);
                    }
                    failed.push(index);
                }
            }
        }

        for index in failed.into_iter().rev() {
            self.plugins.remove(index).unload();
        }
        started
    }

    /// Finishes every started plugin and unloads all of them, most recently
    /// registered first.
    pub fn unload_all_plugins(&mut self, ctx: &mut PluginContext<'_>) {
        info!("🛑 Shutting down {} plugins", self.plugins.len());

        while let Some(mut loaded) = self.plugins.pop() {
            if loaded.started {
                let result = catch_unwind(AssertUnwindSafe(|| loaded.plugin.finish(ctx)))
                    .unwrap_or_else(|panic| Err(PluginError::from_panic(panic)));
                match result {
                    Ok(()) => info!("✅ Plugin finished: {}", loaded.handle.name),
                    Err(e) => error!("❌ Plugin finish failed for {}: {}", loaded.handle.name, e),
                }
            }

            // adaptors must not outlive the library their code lives in
            let leftover = loaded.incoming_added.iter().filter(|(tag, id)| ctx.incoming.remove_adaptor(*tag, id)).count()
                + loaded.outgoing_added.iter().filter(|(tag, id)| ctx.outgoing.remove_adaptor(*tag, id)).count();
            if leftover > 0 {
                warn!("🧹 Removed {} adaptor(s) {} left registered", leftover, loaded.handle.name);
            }
            loaded.unload();
        }

        info!("🧹 Plugin cleanup completed");
    }

    /// Gets the number of currently registered plugins.
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Registered plugins in registration order.
    pub fn plugin_handles(&self) -> Vec<PluginHandle> {
        self.plugins.iter().map(|p| p.handle.clone()).collect()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.handle.name.clone()).collect()
    }

    pub fn is_plugin_loaded(&self, plugin_name: &str) -> bool {
        self.plugins.iter().any(|p| p.handle.name == plugin_name)
    }

    fn is_whitelisted(&self, path: &Path) -> bool {
        let Some(whitelist) = &self.whitelist else {
            return true;
        };
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let name = stem.strip_prefix("lib").unwrap_or(&stem);
        whitelist.iter().any(|allowed| allowed == name || *allowed == stem)
    }

    /// Validates plugin compatibility using ABI version strings.
    ///
    /// ABI version format: "crate_version:rust_version" (e.g., "0.3.0:1.75.0").
    /// Checks both the disgate_protocol version and the Rust compiler version.
    /// `--danger-allow-abi-mismatch` and `--danger-allow-unsafe-plugins`
    /// override the respective check.
    fn validate_plugin_compatibility(&self, plugin_version: &str, expected_version: &str) -> Result<(), PluginSystemError> {
        let plugin_parts: Vec<&str> = plugin_version.split(':').collect();
        let expected_parts: Vec<&str> = expected_version.split(':').collect();

        if plugin_parts.len() != 2 || expected_parts.len() != 2 {
            return Err(PluginSystemError::VersionMismatch(format!(
                "Invalid version format. Expected 'crate:rust', got plugin='{}', expected='{}'",
                plugin_version, expected_version
            )));
        }

        let (plugin_crate_version, plugin_rust_version) = (plugin_parts[0], plugin_parts[1]);
        let (expected_crate_version, expected_rust_version) = (expected_parts[0], expected_parts[1]);

        let versions_compatible = if self.safety_config.strict_versioning {
            plugin_crate_version == expected_crate_version
        } else {
            versions_major_minor_compatible(plugin_crate_version, expected_crate_version)
        };

        if !versions_compatible && !self.safety_config.allow_abi_mismatch {
            let comparison_type = if self.safety_config.strict_versioning { "exact" } else { "major.minor" };
            return Err(PluginSystemError::VersionMismatch(format!(
                "ABI version mismatch: plugin compiled against disgate_protocol v{}, but host uses v{} ({} matching required). \
                Recompile the plugin against the correct version, or use --danger-allow-abi-mismatch to override (NOT RECOMMENDED).",
                plugin_crate_version, expected_crate_version, comparison_type
            )));
        }

        let rust_known = plugin_rust_version != "unknown" && expected_rust_version != "unknown";
        if rust_known && plugin_rust_version != expected_rust_version && !self.safety_config.allow_unsafe_plugins {
            return Err(PluginSystemError::VersionMismatch(format!(
                "Rust compiler version mismatch: plugin compiled with Rust {}, but host compiled with Rust {}. \
                Trait object layouts may differ. Recompile with the same Rust version, or use --danger-allow-unsafe-plugins to override (MAY CAUSE CRASHES).",
                plugin_rust_version, expected_rust_version
            )));
        }

        if self.safety_config.allow_abi_mismatch && plugin_crate_version != expected_crate_version {
            warn!(
                "Loading plugin with ABI version mismatch (override enabled): plugin v{} != host v{}",
                plugin_crate_version, expected_crate_version
            );
        }

        if self.safety_config.allow_unsafe_plugins && rust_known && plugin_rust_version != expected_rust_version {
            warn!(
                "Loading plugin with Rust compiler version mismatch (override enabled): plugin {} != host {}",
                plugin_rust_version, expected_rust_version
            );
        }

        Ok(())
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new(PluginSafetyConfig::default())
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugin_names())
            .field("safety_config", &self.safety_config)
            .field("whitelist", &self.whitelist)
            .finish()
    }
}

/// Lists dynamic libraries in `directory`, sorted by path.
///
/// Looks for the platform extension: .dll on Windows, .dylib on macOS and
/// .so elsewhere.
pub fn discover_plugin_files<P: AsRef<Path>>(directory: P) -> Result<Vec<PathBuf>, PluginSystemError> {
    let mut plugin_files = Vec::new();

    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(extension) = path.extension() else {
            continue;
        };
        let ext_str = extension.to_string_lossy().to_lowercase();

        #[cfg(target_os = "windows")]
        let is_plugin = ext_str == "dll";

        #[cfg(target_os = "macos")]
        let is_plugin = ext_str == "dylib";

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let is_plugin = ext_str == "so";

        if is_plugin {
            plugin_files.push(path);
        }
    }

    plugin_files.sort();
    Ok(plugin_files)
}

/// Checks if two version strings are compatible using major.minor comparison.
/// Ignores patch versions (e.g., "0.3.2" is compatible with "0.3.0").
fn added_since<Tag: PartialEq>(now: Vec<(Tag, AdaptorId)>, before: &[(Tag, AdaptorId)]) -> Vec<(Tag, AdaptorId)> {
    now.into_iter().filter(|entry| !before.contains(entry)).collect()
}

fn versions_major_minor_compatible(plugin_version: &str, expected_version: &str) -> bool {
    let parse_major_minor = |version: &str| -> Option<(u32, u32)> {
        let mut parts = version.split('.');
        let major = parts.next()?.parse::<u32>().ok()?;
        let minor = parts.next()?.parse::<u32>().ok()?;
        Some((major, minor))
    };

    match (parse_major_minor(plugin_version), parse_major_minor(expected_version)) {
        (Some(plugin), Some(expected)) => plugin == expected,
        // unparseable versions must match exactly
        _ => plugin_version == expected_version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disgate_protocol::{
        ActorEvent, ActorRegistry, AdaptorId, IncomingAdaptor, IncomingMessage, LocalMessageType, NetworkSession,
        OutgoingAdaptor, OutgoingContext, OutgoingMessage, Pdu, PduType, SharedState,
    };
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[cfg(target_os = "windows")]
    const PLUGIN_EXTENSION: &str = "dll";
    #[cfg(target_os = "macos")]
    const PLUGIN_EXTENSION: &str = "dylib";
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    const PLUGIN_EXTENSION: &str = "so";

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        /// Starts, but leaves its adaptors registered on finish
        Leaky,
        Fail,
        Panic,
    }

    struct ScriptedPlugin {
        name: &'static str,
        behavior: Behavior,
        journal: Arc<Mutex<Vec<String>>>,
    }

    impl NetworkPlugin for ScriptedPlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        fn start(&mut self, ctx: &mut PluginContext<'_>) -> Result<(), PluginError> {
            self.journal.lock().unwrap().push(format!("start {}", self.name));
            ctx.incoming.add_adaptor(PduType::FIRE, Arc::new(Tagged(self.name)));
            ctx.outgoing.add_adaptor(LocalMessageType::ActorUpdated, Arc::new(Tagged(self.name)));
            match self.behavior {
                Behavior::Succeed | Behavior::Leaky => Ok(()),
                Behavior::Fail => Err(PluginError::StartFailed("refused".to_string())),
                Behavior::Panic => panic!("plugin {} exploded", self.name),
            }
        }

        fn finish(&mut self, ctx: &mut PluginContext<'_>) -> Result<(), PluginError> {
            self.journal.lock().unwrap().push(format!("finish {}", self.name));
            if !matches!(self.behavior, Behavior::Leaky) {
                ctx.incoming.remove_adaptor(PduType::FIRE, &AdaptorId::new(self.name));
                ctx.outgoing.remove_adaptor(LocalMessageType::ActorUpdated, &AdaptorId::new(self.name));
            }
            Ok(())
        }
    }

    /// Does nothing; only its registration matters.
    struct Tagged(&'static str);

    impl IncomingAdaptor for Tagged {
        fn id(&self) -> AdaptorId {
            AdaptorId::new(self.0)
        }

        fn convert(&self, _pdu: &Pdu, _session: &mut NetworkSession) -> Vec<ActorEvent> {
            Vec::new()
        }
    }

    impl OutgoingAdaptor for Tagged {
        fn id(&self) -> AdaptorId {
            AdaptorId::new(self.0)
        }

        fn convert(&self, _event: &ActorEvent, _ctx: &mut OutgoingContext<'_>) -> Option<Pdu> {
            None
        }
    }

    fn scripted(name: &'static str, behavior: Behavior, journal: &Arc<Mutex<Vec<String>>>) -> Box<dyn NetworkPlugin> {
        Box::new(ScriptedPlugin { name, behavior, journal: Arc::clone(journal) })
    }

    #[test]
    fn test_version_mismatch_error() {
        let error = PluginSystemError::VersionMismatch("expected 1, got 2".to_string());
        let error_message = format!("{}", error);
        assert!(error_message.contains("Plugin version mismatch"));
        assert!(error_message.contains("expected 1, got 2"));
    }

    #[test]
    fn test_plugin_discovery_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let temp_path = temp_dir.path();

        let second = temp_path.join(format!("zeta_plugin.{}", PLUGIN_EXTENSION));
        let first = temp_path.join(format!("alpha_plugin.{}", PLUGIN_EXTENSION));
        fs::write(&second, "dummy content").unwrap();
        fs::write(&first, "dummy content").unwrap();
        fs::write(temp_path.join("not_a_plugin.txt"), "dummy content").unwrap();
        fs::create_dir(temp_path.join(format!("directory.{}", PLUGIN_EXTENSION))).unwrap();

        let discovered = discover_plugin_files(temp_path).unwrap();
        assert_eq!(discovered, vec![first, second]);
    }

    #[test]
    fn test_broken_libraries_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(format!("broken.{}", PLUGIN_EXTENSION)), "not a library").unwrap();

        let mut registry = PluginRegistry::default();
        assert_eq!(registry.load_plugins_from_directory(temp_dir.path()).unwrap(), 0);
        assert_eq!(registry.plugin_count(), 0);

        let direct = registry.load_plugin(temp_dir.path().join(format!("broken.{}", PLUGIN_EXTENSION)));
        assert!(matches!(direct, Err(PluginSystemError::LibraryError(_))));
    }

    #[test]
    fn test_missing_directory_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = PluginRegistry::default();
        assert_eq!(registry.load_plugins_from_directory(temp_dir.path().join("absent")).unwrap(), 0);

        let file = temp_dir.path().join("file");
        fs::write(&file, "").unwrap();
        assert!(matches!(registry.load_plugins_from_directory(&file), Err(PluginSystemError::IoError(_))));
    }

    #[test]
    fn test_whitelist_matches_library_names() {
        let registry = PluginRegistry::default().with_whitelist(vec!["plugin_pdu_logger".to_string()]);
        assert!(registry.is_whitelisted(Path::new("/plugins/libplugin_pdu_logger.so")));
        assert!(registry.is_whitelisted(Path::new("/plugins/plugin_pdu_logger.dll")));
        assert!(!registry.is_whitelisted(Path::new("/plugins/libother.so")));
        assert!(PluginRegistry::default().is_whitelisted(Path::new("/plugins/libother.so")));
    }

    #[test]
    fn test_duplicate_static_plugins_are_rejected() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PluginRegistry::default();

        let handle = registry.register_static(scripted("a", Behavior::Succeed, &journal)).unwrap();
        assert_eq!(handle.source, PluginSource::Static);
        assert!(matches!(
            registry.register_static(scripted("a", Behavior::Succeed, &journal)),
            Err(PluginSystemError::PluginAlreadyExists(name)) if name == "a"
        ));
        assert_eq!(registry.plugin_count(), 1);
    }

    #[test]
    fn test_failing_plugins_are_unloaded_and_the_rest_run() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PluginRegistry::default();
        registry.register_static(scripted("good", Behavior::Succeed, &journal)).unwrap();
        registry.register_static(scripted("refuses", Behavior::Fail, &journal)).unwrap();
        registry.register_static(scripted("panics", Behavior::Panic, &journal)).unwrap();
        registry.register_static(scripted("also_good", Behavior::Succeed, &journal)).unwrap();

        let mut incoming = IncomingMessage::new();
        let mut outgoing = OutgoingMessage::new(1500);
        let sim = ActorRegistry::new();
        let shared = SharedState::new();
        let mut ctx = PluginContext { incoming: &mut incoming, outgoing: &mut outgoing, simulation: &sim, shared: &shared };

        assert_eq!(registry.start_all(&mut ctx), 2);
        assert_eq!(registry.plugin_names(), vec!["good", "also_good"]);
        assert_eq!(ctx.incoming.adaptor_count(), 2);
        assert_eq!(ctx.outgoing.adaptor_count(), 2);
        // already started plugins are not started again
        assert_eq!(registry.start_all(&mut ctx), 0);

        registry.unload_all_plugins(&mut ctx);
        assert_eq!(registry.plugin_count(), 0);
        assert_eq!(ctx.incoming.adaptor_count(), 0);
        assert_eq!(ctx.outgoing.adaptor_count(), 0);

        let journal = journal.lock().unwrap().clone();
        assert_eq!(
            journal,
            vec![
                "start good",
                "start refuses",
                "start panics",
                "start also_good",
                "finish also_good",
                "finish good",
            ]
        );
    }

    #[test]
    fn test_failed_start_unregisters_its_adaptors() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PluginRegistry::default();
        registry.register_static(scripted("good", Behavior::Succeed, &journal)).unwrap();
        registry.register_static(scripted("half_started", Behavior::Fail, &journal)).unwrap();
        registry.register_static(scripted("half_panicked", Behavior::Panic, &journal)).unwrap();

        let mut incoming = IncomingMessage::new();
        let mut outgoing = OutgoingMessage::new(1500);
        let sim = ActorRegistry::new();
        let shared = SharedState::new();
        let mut ctx = PluginContext { incoming: &mut incoming, outgoing: &mut outgoing, simulation: &sim, shared: &shared };

        assert_eq!(registry.start_all(&mut ctx), 1);
        assert_eq!(registry.plugin_names(), vec!["good"]);

        // only the adaptors of the plugin that started remain
        assert_eq!(ctx.incoming.registrations(), vec![(PduType::FIRE, AdaptorId::new("good"))]);
        assert_eq!(ctx.outgoing.registrations(), vec![(LocalMessageType::ActorUpdated, AdaptorId::new("good"))]);
    }

    #[test]
    fn test_unload_removes_adaptors_a_plugin_left_behind() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PluginRegistry::default();
        registry.register_static(scripted("leaky", Behavior::Leaky, &journal)).unwrap();

        let mut incoming = IncomingMessage::new();
        let mut outgoing = OutgoingMessage::new(1500);
        let sim = ActorRegistry::new();
        let shared = SharedState::new();
        let mut ctx = PluginContext { incoming: &mut incoming, outgoing: &mut outgoing, simulation: &sim, shared: &shared };

        // registered by the host, not by the plugin
        ctx.outgoing.add_adaptor(LocalMessageType::ActorCreated, Arc::new(Tagged("host")));

        assert_eq!(registry.start_all(&mut ctx), 1);
        assert_eq!(ctx.incoming.adaptor_count(), 1);
        assert_eq!(ctx.outgoing.adaptor_count(), 2);

        registry.unload_all_plugins(&mut ctx);
        assert_eq!(*journal.lock().unwrap(), vec!["start leaky", "finish leaky"]);
        assert_eq!(ctx.incoming.adaptor_count(), 0);
        assert_eq!(ctx.outgoing.registrations(), vec![(LocalMessageType::ActorCreated, AdaptorId::new("host"))]);
    }

    #[test]
    fn test_expected_plugin_version_constant() {
        let expected_version = disgate_protocol::ABI_VERSION;
        let parts: Vec<&str> = expected_version.split(':').collect();
        assert_eq!(parts.len(), 2, "ABI version should have exactly 2 parts separated by ':'");
        assert!(parts[0].contains('.'), "Crate version should contain '.' separators");
        assert!(!parts[1].is_empty(), "Rust version should not be empty");
        assert_eq!(disgate_protocol::ABI_VERSION_NUL.trim_end_matches('\0'), expected_version);
    }

    #[test]
    fn test_plugin_compatibility_validation() {
        let manager_strict = PluginRegistry::new(PluginSafetyConfig { strict_versioning: true, ..Default::default() });
        assert!(manager_strict.validate_plugin_compatibility("0.3.0:1.75.0", "0.3.0:1.75.0").is_ok());

        let result = manager_strict.validate_plugin_compatibility("0.2.0:1.75.0", "0.3.0:1.75.0");
        assert!(matches!(result, Err(PluginSystemError::VersionMismatch(_))));

        let result = manager_strict.validate_plugin_compatibility("0.3.0:1.74.0", "0.3.0:1.75.0");
        assert!(matches!(result, Err(PluginSystemError::VersionMismatch(_))));

        let manager_unsafe = PluginRegistry::new(PluginSafetyConfig {
            allow_unsafe_plugins: true,
            allow_abi_mismatch: true,
            strict_versioning: false,
        });
        assert!(manager_unsafe.validate_plugin_compatibility("0.2.0:1.74.0", "0.3.0:1.75.0").is_ok());

        // an unknown compiler on either side skips the rustc comparison
        assert!(manager_strict.validate_plugin_compatibility("0.3.0:unknown", "0.3.0:1.75.0").is_ok());
        assert!(manager_strict.validate_plugin_compatibility("0.3.0:1.75.0", "0.3.0:unknown").is_ok());

        let result = manager_strict.validate_plugin_compatibility("invalid", "0.3.0:1.75.0");
        assert!(matches!(result, Err(PluginSystemError::VersionMismatch(_))));
    }

    #[test]
    fn test_relaxed_versioning() {
        let manager_relaxed = PluginRegistry::new(PluginSafetyConfig::default());
        assert!(manager_relaxed.validate_plugin_compatibility("0.3.2:1.75.0", "0.3.0:1.75.0").is_ok());
        assert!(manager_relaxed.validate_plugin_compatibility("1.3.0:1.75.0", "0.3.0:1.75.0").is_err());
        assert!(manager_relaxed.validate_plugin_compatibility("0.2.0:1.75.0", "0.3.0:1.75.0").is_err());

        let manager_strict = PluginRegistry::new(PluginSafetyConfig { strict_versioning: true, ..Default::default() });
        assert!(manager_strict.validate_plugin_compatibility("0.3.2:1.75.0", "0.3.0:1.75.0").is_err());
    }

    #[test]
    fn test_major_minor_version_parsing() {
        assert!(versions_major_minor_compatible("1.2.3", "1.2.0"));
        assert!(versions_major_minor_compatible("1.2.0", "1.2.999"));
        assert!(!versions_major_minor_compatible("1.2.0", "1.3.0"));
        assert!(!versions_major_minor_compatible("1.2.0", "2.2.0"));

        assert!(versions_major_minor_compatible("invalid", "invalid"));
        assert!(!versions_major_minor_compatible("invalid", "1.2.0"));
    }
}
