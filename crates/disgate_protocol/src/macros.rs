/// Generates the C ABI entry points a dynamically loaded plugin must export.
///
/// `$ty` must implement [`NetworkPlugin`](crate::NetworkPlugin); `$ctor` is
/// an expression producing an instance of it.
///
/// ```rust,ignore
/// use disgate_protocol::export_plugin;
///
/// export_plugin!(PduLoggerPlugin, PduLoggerPlugin::new());
/// ```
///
/// Two symbols are exported:
///
/// - `get_plugin_version` returns [`ABI_VERSION`](crate::ABI_VERSION) as a
///   static C string so the loader can refuse incompatible builds before
///   touching any trait object
/// - `create_plugin` boxes the plugin and hands ownership to the loader;
///   a panic in the constructor yields a null pointer instead of unwinding
///   across the FFI boundary
#[macro_export]
macro_rules! export_plugin {
    ($ty:ty, $ctor:expr) => {
        #[no_mangle]
        pub extern "C" fn get_plugin_version() -> *const ::std::os::raw::c_char {
            $crate::ABI_VERSION_NUL.as_ptr() as *const ::std::os::raw::c_char
        }

        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn create_plugin() -> *mut dyn $crate::NetworkPlugin {
            match ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {
                let plugin: ::std::boxed::Box<dyn $crate::NetworkPlugin> = ::std::boxed::Box::new(
                    { let instance: $ty = $ctor; instance }
                );
                ::std::boxed::Box::into_raw(plugin)
            })) {
                Ok(ptr) => ptr,
                Err(_) => ::std::ptr::null_mut::<$ty>() as *mut dyn $crate::NetworkPlugin,
            }
        }
    };
}
