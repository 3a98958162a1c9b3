//! Export helper for native extension modules.

/// Export handlers from a `cdylib` as the `extern "C"` entry points the
/// loader looks up.
///
/// Each key maps to a handler with the matching signature from
/// [`crate::extension::module`]. Keys that are left out are not exported.
/// `Init` and `Destroy` are always exported: `Init` keeps the host table
/// (and then calls the `init` handler, if given) and `Destroy` releases data
/// installed with [`Host::set_data`](crate::extension::module::Host::set_data).
///
/// The macro also defines `native_entries()`, which lists the exported
/// entries for registering the module in-process with
/// [`Gui::register_native_extension`](crate::Gui::register_native_extension).
///
/// Invoke it once per crate, at the crate root.
///
/// ```ignore
/// guise::export_extension! {
///     count: count,
///     parse_widget: parse,
///     build_widget: build,
///     on_click: click,
/// }
/// ```
#[macro_export]
macro_rules! export_extension {
    (@find_init) => {
        ::std::option::Option::None
    };
    (@find_init init : $f:path $(, $($rest:tt)*)?) => {{
        let f: $crate::extension::module::InitHandler = $f;
        ::std::option::Option::Some(f)
    }};
    (@find_init $key:ident : $f:path $(, $($rest:tt)*)?) => {
        $crate::export_extension!(@find_init $($($rest)*)?)
    };

    (@register $entries:ident init) => {};
    (@register $entries:ident count) => { $entries.count = Some(Count); };
    (@register $entries:ident measure) => { $entries.measure = Some(Measure); };
    (@register $entries:ident parse_layout) => { $entries.parse_layout = Some(ParseLayout); };
    (@register $entries:ident parse_widget) => { $entries.parse_widget = Some(ParseWidget); };
    (@register $entries:ident build_layout) => { $entries.build_layout = Some(BuildLayout); };
    (@register $entries:ident build_widget) => { $entries.build_widget = Some(BuildWidget); };
    (@register $entries:ident build_children) => { $entries.build_children = Some(BuildChildren); };
    (@register $entries:ident on_enter) => { $entries.on_enter = Some(OnEnter); };
    (@register $entries:ident on_exit) => { $entries.on_exit = Some(OnExit); };
    (@register $entries:ident on_click) => { $entries.on_click = Some(OnClick); };
    (@register $entries:ident on_release_inside) => { $entries.on_release_inside = Some(OnReleaseInside); };
    (@register $entries:ident on_release_outside) => { $entries.on_release_outside = Some(OnReleaseOutside); };
    (@register $entries:ident on_scroll) => { $entries.on_scroll = Some(OnScroll); };
    (@register $entries:ident on_update) => { $entries.on_update = Some(OnUpdate); };
    (@register $entries:ident on_popup_closed) => { $entries.on_popup_closed = Some(OnPopupClosed); };
    (@register $entries:ident on_child_clicked) => { $entries.on_child_clicked = Some(OnChildClicked); };
    (@register $entries:ident on_child_released) => { $entries.on_child_released = Some(OnChildReleased); };
    (@register $entries:ident on_child_update) => { $entries.on_child_update = Some(OnChildUpdate); };
    (@register $entries:ident query_number) => { $entries.query_number = Some(QueryNumber); };
    (@register $entries:ident query_string) => { $entries.query_string = Some(QueryString); };
    (@register $entries:ident set_number) => { $entries.set_number = Some(SetNumber); };
    (@register $entries:ident set_string) => { $entries.set_string = Some(SetString); };

    (@entry init $f:path) => {};
    (@entry count $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn Count(
            context: *mut $crate::extension::abi::HostContext,
            source: *const $crate::extension::abi::SourceHandle,
        ) -> u32 {
            let f: $crate::extension::module::CountHandler = $f;
            match $crate::extension::module::Host::enter(&__GUISE_HOST, context) {
                Some(host) => f(&host, &host.source(source)) as u32,
                None => 1,
            }
        }
    };
    (@entry measure $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn Measure(
            context: *mut $crate::extension::abi::HostContext,
            source: *const $crate::extension::abi::SourceHandle,
            width: *mut i32,
            height: *mut i32,
        ) {
            let f: $crate::extension::module::MeasureHandler = $f;
            let (w, h) = match $crate::extension::module::Host::enter(&__GUISE_HOST, context) {
                Some(host) => f(&host, &host.source(source)),
                None => (-1, -1),
            };
            if !width.is_null() {
                *width = w;
            }
            if !height.is_null() {
                *height = h;
            }
        }
    };
    (@entry parse_layout $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn ParseLayout(
            context: *mut $crate::extension::abi::HostContext,
            source: *const $crate::extension::abi::SourceHandle,
            layout: u32,
            first_child: u32,
        ) -> u32 {
            let f: $crate::extension::module::ParseLayoutHandler = $f;
            match $crate::extension::module::Host::enter(&__GUISE_HOST, context) {
                Some(mut host) => {
                    let source = host.source(source);
                    f(
                        &mut host,
                        &source,
                        $crate::LayoutId::from_raw(layout),
                        $crate::WidgetId::from_raw(first_child),
                    ) as u32
                }
                None => 0,
            }
        }
    };
    (@entry parse_widget $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn ParseWidget(
            context: *mut $crate::extension::abi::HostContext,
            source: *const $crate::extension::abi::SourceHandle,
            widget: u32,
        ) -> u32 {
            let f: $crate::extension::module::ParseWidgetHandler = $f;
            match $crate::extension::module::Host::enter(&__GUISE_HOST, context) {
                Some(mut host) => {
                    let source = host.source(source);
                    f(&mut host, &source, $crate::WidgetId::from_raw(widget)) as u32
                }
                None => 0,
            }
        }
    };
    (@entry build_layout $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn BuildLayout(
            context: *mut $crate::extension::abi::HostContext,
            layout: u32,
            children: *const u64,
            len: usize,
        ) {
            let f: $crate::extension::module::BuildLayoutHandler = $f;
            if let Some(mut host) = $crate::extension::module::Host::enter(&__GUISE_HOST, context) {
                let children = $crate::extension::module::element_ids(children, len);
                f(&mut host, $crate::LayoutId::from_raw(layout), &children)
            }
        }
    };
    (@entry build_widget $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn BuildWidget(context: *mut $crate::extension::abi::HostContext, widget: u32) {
            let f: $crate::extension::module::BuildWidgetHandler = $f;
            if let Some(mut host) = $crate::extension::module::Host::enter(&__GUISE_HOST, context) {
                f(&mut host, $crate::WidgetId::from_raw(widget))
            }
        }
    };
    (@entry build_children $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn BuildChildren(
            context: *mut $crate::extension::abi::HostContext,
            widget: u32,
            children: *const u64,
            len: usize,
        ) {
            let f: $crate::extension::module::BuildChildrenHandler = $f;
            if let Some(mut host) = $crate::extension::module::Host::enter(&__GUISE_HOST, context) {
                let children = $crate::extension::module::element_ids(children, len);
                f(&mut host, $crate::WidgetId::from_raw(widget), &children)
            }
        }
    };
    (@entry on_enter $f:path) => {
        $crate::export_extension!(@hover OnEnter $f);
    };
    (@entry on_exit $f:path) => {
        $crate::export_extension!(@hover OnExit $f);
    };
    (@entry on_click $f:path) => {
        $crate::export_extension!(@pointer OnClick $f);
    };
    (@entry on_release_inside $f:path) => {
        $crate::export_extension!(@pointer OnReleaseInside $f);
    };
    (@entry on_release_outside $f:path) => {
        $crate::export_extension!(@pointer OnReleaseOutside $f);
    };
    (@entry on_scroll $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn OnScroll(
            context: *mut $crate::extension::abi::HostContext,
            element: u64,
            dx: i32,
            dy: i32,
        ) -> bool {
            let f: $crate::extension::module::ScrollHandler = $f;
            match $crate::extension::module::Host::enter(&__GUISE_HOST, context) {
                Some(mut host) => f(&mut host, $crate::ElementId::from_raw(element), dx, dy),
                None => false,
            }
        }
    };
    (@entry on_update $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn OnUpdate(
            context: *mut $crate::extension::abi::HostContext,
            widget: u32,
            x: i32,
            y: i32,
        ) {
            let f: $crate::extension::module::UpdateHandler = $f;
            if let Some(mut host) = $crate::extension::module::Host::enter(&__GUISE_HOST, context) {
                f(&mut host, $crate::WidgetId::from_raw(widget), x, y)
            }
        }
    };
    (@entry on_popup_closed $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn OnPopupClosed(
            context: *mut $crate::extension::abi::HostContext,
            owner: u32,
            mouse_down: bool,
        ) {
            let f: $crate::extension::module::PopupClosedHandler = $f;
            if let Some(mut host) = $crate::extension::module::Host::enter(&__GUISE_HOST, context) {
                f(&mut host, $crate::WidgetId::from_raw(owner), mouse_down)
            }
        }
    };
    (@entry on_child_clicked $f:path) => {
        $crate::export_extension!(@child OnChildClicked $f);
    };
    (@entry on_child_released $f:path) => {
        $crate::export_extension!(@child OnChildReleased $f);
    };
    (@entry on_child_update $f:path) => {
        $crate::export_extension!(@child OnChildUpdate $f);
    };
    (@entry query_number $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn QueryNumber(
            context: *mut $crate::extension::abi::HostContext,
            element: u64,
            key: *const u8,
            key_len: usize,
            out: *mut f32,
        ) -> bool {
            let f: $crate::extension::module::QueryNumberHandler = $f;
            let host = $crate::extension::module::Host::enter(&__GUISE_HOST, context);
            let key = $crate::extension::abi::read_str(key, key_len);
            let (Some(host), Some(key)) = (host, key) else {
                return false;
            };
            match f(&host, $crate::ElementId::from_raw(element), key) {
                Some(value) if !out.is_null() => {
                    *out = value;
                    true
                }
                _ => false,
            }
        }
    };
    (@entry query_string $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn QueryString(
            context: *mut $crate::extension::abi::HostContext,
            element: u64,
            key: *const u8,
            key_len: usize,
            buf: *mut u8,
            cap: usize,
        ) -> isize {
            let f: $crate::extension::module::QueryStringHandler = $f;
            let host = $crate::extension::module::Host::enter(&__GUISE_HOST, context);
            let key = $crate::extension::abi::read_str(key, key_len);
            let (Some(host), Some(key)) = (host, key) else {
                return -1;
            };
            let value = f(&host, $crate::ElementId::from_raw(element), key);
            $crate::extension::module::return_string(value, buf, cap)
        }
    };
    (@entry set_number $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn SetNumber(
            context: *mut $crate::extension::abi::HostContext,
            element: u64,
            key: *const u8,
            key_len: usize,
            value: f32,
        ) -> bool {
            let f: $crate::extension::module::SetNumberHandler = $f;
            let host = $crate::extension::module::Host::enter(&__GUISE_HOST, context);
            let key = $crate::extension::abi::read_str(key, key_len);
            match (host, key) {
                (Some(mut host), Some(key)) => f(&mut host, $crate::ElementId::from_raw(element), key, value),
                _ => false,
            }
        }
    };
    (@entry set_string $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn SetString(
            context: *mut $crate::extension::abi::HostContext,
            element: u64,
            key: *const u8,
            key_len: usize,
            value: *const u8,
            value_len: usize,
        ) -> bool {
            let f: $crate::extension::module::SetStringHandler = $f;
            let host = $crate::extension::module::Host::enter(&__GUISE_HOST, context);
            let key = $crate::extension::abi::read_str(key, key_len);
            let value = $crate::extension::abi::read_str(value, value_len);
            match (host, key, value) {
                (Some(mut host), Some(key), Some(value)) => {
                    f(&mut host, $crate::ElementId::from_raw(element), key, value)
                }
                _ => false,
            }
        }
    };

    (@hover $name:ident $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn $name(context: *mut $crate::extension::abi::HostContext, widget: u32) {
            let f: $crate::extension::module::HoverHandler = $f;
            if let Some(mut host) = $crate::extension::module::Host::enter(&__GUISE_HOST, context) {
                f(&mut host, $crate::WidgetId::from_raw(widget))
            }
        }
    };
    (@pointer $name:ident $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn $name(
            context: *mut $crate::extension::abi::HostContext,
            widget: u32,
            x: i32,
            y: i32,
        ) -> bool {
            let f: $crate::extension::module::PointerHandler = $f;
            match $crate::extension::module::Host::enter(&__GUISE_HOST, context) {
                Some(mut host) => f(&mut host, $crate::WidgetId::from_raw(widget), x, y),
                None => false,
            }
        }
    };
    (@child $name:ident $f:path) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn $name(
            context: *mut $crate::extension::abi::HostContext,
            ancestor: u64,
            child: u32,
            x: i32,
            y: i32,
        ) -> bool {
            let f: $crate::extension::module::ChildEventHandler = $f;
            match $crate::extension::module::Host::enter(&__GUISE_HOST, context) {
                Some(mut host) => f(
                    &mut host,
                    $crate::ElementId::from_raw(ancestor),
                    $crate::WidgetId::from_raw(child),
                    x,
                    y,
                ),
                None => false,
            }
        }
    };

    ($($key:ident : $handler:path),* $(,)?) => {
        static __GUISE_HOST: ::std::sync::atomic::AtomicPtr<$crate::extension::abi::HostFunctions> =
            ::std::sync::atomic::AtomicPtr::new(::std::ptr::null_mut());

        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn Init(
            font_height: i32,
            host: *const $crate::extension::abi::HostFunctions,
        ) {
            if $crate::extension::module::install(&__GUISE_HOST, host) {
                let init: ::std::option::Option<$crate::extension::module::InitHandler> =
                    $crate::export_extension!(@find_init $($key : $handler),*);
                if let Some(init) = init {
                    init(font_height);
                }
            }
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn Destroy(data: *mut ::std::ffi::c_void) {
            $crate::extension::module::release_data(data)
        }

        $($crate::export_extension!(@entry $key $handler);)*

        /// The entry points exported by this module.
        pub fn native_entries() -> $crate::extension::abi::NativeEntries {
            let mut entries = $crate::extension::abi::NativeEntries {
                init: Some(Init),
                destroy: Some(Destroy),
                ..Default::default()
            };
            $($crate::export_extension!(@register entries $key);)*
            entries
        }
    };
}
