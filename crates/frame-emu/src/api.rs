//! The `frame` table guest scripts program against.
//!
//! Every function installed here runs on the script thread. Each one first
//! passes a safepoint (stop check, then inbound delivery) and only then
//! takes the display lock, for exactly one primitive.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};
use std::{fmt, thread};

use frame_display::{
    Alignment, Color, Display, DisplayError, PALETTE_NAMES, Palette, TextStyle,
    text::DEFAULT_TEXT_SIZE,
};
use log::{debug, info, warn};
use mlua::{
    FromLuaMulti, Function, IntoLuaMulti, Lua, Table, UserData, UserDataMethods, Value, Variadic,
};

use crate::host::{Host, MAX_PACKET_LENGTH};

/// Registry slot holding the guest's receive callback.
const RECEIVE_CALLBACK: &str = "frame.receive_callback";

/// Longest single wait inside `frame.sleep` before re-checking the stop flag.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Log target for guest `print` output.
pub const SCRIPT_LOG_TARGET: &str = "frame::script";

/// Raised into the script when a stop has been requested.
#[derive(Debug)]
pub(crate) struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("script stopped")
    }
}

impl std::error::Error for Interrupted {}

pub(crate) fn interrupted() -> mlua::Error {
    mlua::Error::external(Interrupted)
}

fn display_err(e: DisplayError) -> mlua::Error {
    mlua::Error::external(e)
}

/// Per-script state shared by every bound function.
pub(crate) struct ScriptContext {
    host: Arc<Host>,
    /// Set while a receive callback runs, so delivery never nests.
    dispatching: Cell<bool>,
}

impl ScriptContext {
    pub(crate) fn new(host: Arc<Host>) -> Self {
        Self {
            host,
            dispatching: Cell::new(false),
        }
    }

    pub(crate) fn check_stop(&self) -> mlua::Result<()> {
        if self.host.stop_requested() {
            Err(interrupted())
        } else {
            Ok(())
        }
    }

    /// Stop check plus delivery of anything queued.
    fn safepoint(&self, lua: &Lua) -> mlua::Result<()> {
        self.check_stop()?;
        self.drain_inbound(lua)
    }

    /// Deliver queued packets. Without a registered callback they stay
    /// queued until one is registered.
    fn drain_inbound(&self, lua: &Lua) -> mlua::Result<()> {
        if self.dispatching.get() || !Self::has_receive_callback(lua)? {
            return Ok(());
        }
        loop {
            let next = self.host.inbound().try_recv();
            let Ok(packet) = next else {
                return Ok(());
            };
            self.dispatch(lua, &packet)?;
        }
    }

    /// Hand one packet to the registered callback, if any.
    pub(crate) fn dispatch(&self, lua: &Lua, packet: &[u8]) -> mlua::Result<()> {
        let callback: Option<Function> = lua.named_registry_value(RECEIVE_CALLBACK)?;
        let Some(callback) = callback else {
            debug!("no receive callback registered, dropping {} bytes", packet.len());
            return Ok(());
        };
        self.dispatching.set(true);
        let result: mlua::Result<()> = lua
            .create_string(packet)
            .and_then(|data| callback.call(data));
        self.dispatching.set(false);
        result
    }

    pub(crate) fn has_receive_callback(lua: &Lua) -> mlua::Result<bool> {
        let callback: Option<Function> = lua.named_registry_value(RECEIVE_CALLBACK)?;
        Ok(callback.is_some())
    }

    /// Wait for the next inbound packet for at most `timeout`.
    pub(crate) fn wait_inbound(&self, lua: &Lua, timeout: Duration) -> mlua::Result<()> {
        if self.dispatching.get() || !Self::has_receive_callback(lua)? {
            thread::sleep(timeout);
            return Ok(());
        }
        let next = self.host.inbound().recv_timeout(timeout);
        match next {
            Ok(packet) => self.dispatch(lua, &packet),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Ok(()),
        }
    }

    /// Sleep without holding any lock, servicing inbound packets.
    fn sleep(&self, lua: &Lua, seconds: f64) -> mlua::Result<()> {
        let span = if seconds.is_finite() && seconds > 0.0 {
            Duration::try_from_secs_f64(seconds).ok()
        } else {
            Some(Duration::ZERO)
        };
        // `None` means too long to represent: sleep until stopped.
        let deadline = span.and_then(|span| Instant::now().checked_add(span));
        loop {
            self.safepoint(lua)?;
            let slice = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(());
                    }
                    remaining.min(SLEEP_SLICE)
                }
                None => SLEEP_SLICE,
            };
            self.wait_inbound(lua, slice)?;
        }
    }

    fn draw(&self, f: impl FnOnce(&mut Display) -> Result<(), DisplayError>) -> mlua::Result<()> {
        self.host.with_display(f).map_err(display_err)
    }
}

// ---------------------------------------------------------------------------
// Argument conversion
// ---------------------------------------------------------------------------

fn integral(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0).then_some(n as i64)
}

/// Guest color: a palette index (0-15), a packed `0xRRGGBB` integer, an
/// `{r=, g=, b=}` table, or a palette name.
fn color_arg(value: &Value) -> mlua::Result<Color> {
    let invalid = |what: String| display_err(DisplayError::InvalidColor(what));
    match value {
        Value::Integer(i) => Ok(Color::from_guest_int(*i)),
        Value::Number(n) => integral(*n)
            .map(Color::from_guest_int)
            .ok_or_else(|| invalid(format!("{n} is not an integer color"))),
        Value::Table(t) => {
            let channel = |key: &str| -> mlua::Result<i64> {
                let v: Option<i64> = t.get(key)?;
                v.ok_or_else(|| invalid(format!("color table is missing '{key}'")))
            };
            Ok(Color::RgbTriple(channel("r")?, channel("g")?, channel("b")?))
        }
        Value::String(s) => {
            let name = s.to_string_lossy();
            Palette::index_of(&name)
                .map(Color::PaletteIndex)
                .ok_or_else(|| invalid(format!("unknown palette color '{name}'")))
        }
        other => Err(invalid(format!("expected a color, got {}", other.type_name()))),
    }
}

/// Palette slot given as an index or a name.
fn slot_arg(value: &Value) -> mlua::Result<i64> {
    match color_arg(value)? {
        Color::PaletteIndex(i) => Ok(i),
        Color::RgbInt(i) => Err(display_err(DisplayError::InvalidColor(format!(
            "palette index {i} outside 0-15"
        )))),
        Color::RgbTriple(..) => Err(display_err(DisplayError::InvalidColor(
            "expected a palette index".to_string(),
        ))),
    }
}

fn size_arg(size: Option<i64>) -> mlua::Result<u32> {
    match size {
        None => Ok(DEFAULT_TEXT_SIZE),
        Some(s) => u32::try_from(s)
            .ok()
            .filter(|&s| s > 0)
            .ok_or_else(|| mlua::Error::RuntimeError(format!("text size {s} must be positive"))),
    }
}

fn alignment_arg(name: Option<&str>) -> Alignment {
    let Some(name) = name else {
        return Alignment::default();
    };
    Alignment::from_name(name).unwrap_or_else(|| {
        warn!("unknown alignment '{name}', using top_left");
        Alignment::default()
    })
}

fn text_style(
    color: Option<Value>,
    size: Option<i64>,
    alignment: Option<String>,
) -> mlua::Result<TextStyle> {
    let defaults = TextStyle::default();
    Ok(TextStyle {
        size: size_arg(size)?,
        color: color.as_ref().map_or(Ok(defaults.color), color_arg)?,
        alignment: alignment_arg(alignment.as_deref()),
    })
}

// ---------------------------------------------------------------------------
// Binding helpers
// ---------------------------------------------------------------------------

/// Install `f` as `table[name]`, behind the safepoint.
fn bind<A, R, F>(
    lua: &Lua,
    table: &Table,
    ctx: &Rc<ScriptContext>,
    name: &str,
    f: F,
) -> mlua::Result<()>
where
    A: FromLuaMulti,
    R: IntoLuaMulti,
    F: Fn(&Lua, &ScriptContext, A) -> mlua::Result<R> + 'static,
{
    let ctx = Rc::clone(ctx);
    let function = lua.create_function(move |lua, args: A| {
        ctx.safepoint(lua)?;
        f(lua, &ctx, args)
    })?;
    table.set(name, function)
}

/// Install every `frame.*` function plus the `print` redirect.
pub(crate) fn install(lua: &Lua, ctx: &Rc<ScriptContext>) -> mlua::Result<()> {
    let frame = lua.create_table()?;
    frame.set("display", display_table(lua, ctx)?)?;
    frame.set("input", input_table(lua, ctx)?)?;
    frame.set("time", time_table(lua, ctx)?)?;
    frame.set("bluetooth", bluetooth_table(lua, ctx)?)?;
    frame.set("file", file_table(lua, ctx)?)?;

    bind(lua, &frame, ctx, "sleep", |lua, ctx, seconds: Option<f64>| {
        ctx.sleep(lua, seconds.unwrap_or(0.0))
    })?;
    bind(lua, &frame, ctx, "battery_level", |_, _, ()| Ok(100))?;

    let globals = lua.globals();
    globals.set("frame", frame)?;
    globals.set("print", print_function(lua)?)?;
    Ok(())
}

fn display_table(lua: &Lua, ctx: &Rc<ScriptContext>) -> mlua::Result<Table> {
    let display = lua.create_table()?;

    let palette_colors = lua.create_table()?;
    for (index, name) in PALETTE_NAMES.iter().enumerate() {
        palette_colors.set(*name, index)?;
    }
    display.set("PaletteColors", palette_colors)?;

    let alignments = lua.create_table()?;
    for alignment in Alignment::ALL {
        alignments.set(alignment.name().to_ascii_uppercase(), alignment.name())?;
    }
    display.set("Alignment", alignments)?;

    bind(lua, &display, ctx, "clear", |_, ctx, color: Option<Value>| {
        let color = color.as_ref().map_or(Ok(Color::PaletteIndex(0)), color_arg)?;
        ctx.draw(|d| d.clear(color))
    })?;
    bind(lua, &display, ctx, "set_pixel", |_, ctx, (x, y, color): (i32, i32, Value)| {
        let color = color_arg(&color)?;
        ctx.draw(|d| d.set_pixel(x, y, color))
    })?;
    bind(
        lua,
        &display,
        ctx,
        "draw_line",
        |_, ctx, (x1, y1, x2, y2, color): (i32, i32, i32, i32, Value)| {
            let color = color_arg(&color)?;
            ctx.draw(|d| d.draw_line(x1, y1, x2, y2, color))
        },
    )?;
    bind(
        lua,
        &display,
        ctx,
        "draw_rect",
        |_, ctx, (x, y, w, h, color): (i32, i32, i32, i32, Value)| {
            let color = color_arg(&color)?;
            ctx.draw(|d| d.draw_rect(x, y, w, h, color))
        },
    )?;
    bind(
        lua,
        &display,
        ctx,
        "fill_rect",
        |_, ctx, (x, y, w, h, color): (i32, i32, i32, i32, Value)| {
            let color = color_arg(&color)?;
            ctx.draw(|d| d.fill_rect(x, y, w, h, color))
        },
    )?;
    bind(
        lua,
        &display,
        ctx,
        "draw_rect_filled",
        |_, ctx, (x, y, w, h, border, border_color, fill_color): (i32, i32, i32, i32, i32, Value, Value)| {
            let border_color = color_arg(&border_color)?;
            let fill_color = color_arg(&fill_color)?;
            ctx.draw(|d| d.draw_rect_filled(x, y, w, h, border, border_color, fill_color))
        },
    )?;
    bind(
        lua,
        &display,
        ctx,
        "bitmap",
        |_, ctx, (x, y, width, mode, color, data): (i32, i32, i64, i64, Value, mlua::String)| {
            let color = color_arg(&color)?;
            let data = data.as_bytes().to_vec();
            ctx.draw(|d| d.bitmap(x, y, width, mode, color, &data))
        },
    )?;
    bind(lua, &display, ctx, "set_palette", |_, ctx, (index, color): (Value, Value)| {
        let index = slot_arg(&index)?;
        let color = color_arg(&color)?;
        ctx.draw(|d| d.set_palette(index, color))
    })?;
    bind(lua, &display, ctx, "show", |_, ctx, ()| {
        ctx.host.with_display(Display::show);
        Ok(())
    })?;

    for name in ["write_text", "text"] {
        bind(
            lua,
            &display,
            ctx,
            name,
            |_, ctx, (x, y, text, color, size, alignment): (i32, i32, String, Option<Value>, Option<i64>, Option<String>)| {
                let style = text_style(color, size, alignment)?;
                ctx.draw(|d| d.write_text(x, y, &text, &style))
            },
        )?;
    }
    bind(lua, &display, ctx, "get_text_width", |_, ctx, (text, size): (String, Option<i64>)| {
        let size = size_arg(size)?;
        Ok(ctx.host.with_display(|d| d.text_width(&text, size)))
    })?;
    bind(lua, &display, ctx, "get_text_height", |_, ctx, (text, size): (String, Option<i64>)| {
        let size = size_arg(size)?;
        Ok(ctx.host.with_display(|d| d.text_height(&text, size)))
    })?;
    bind(
        lua,
        &display,
        ctx,
        "wrap_text",
        |_, ctx, (text, max_width, size): (String, i64, Option<i64>)| {
            let size = size_arg(size)?;
            let max_width = u32::try_from(max_width.max(0)).unwrap_or(u32::MAX);
            Ok(ctx.host.with_display(|d| d.wrap_text(&text, max_width, size)))
        },
    )?;

    bind(
        lua,
        &display,
        ctx,
        "assign_color",
        |_, ctx, (index, r, g, b): (Value, i64, i64, i64)| {
            let index = slot_arg(&index)?;
            ctx.draw(|d| d.assign_color(index, r, g, b))
        },
    )?;
    bind(
        lua,
        &display,
        ctx,
        "assign_color_ycbcr",
        |_, ctx, (index, y, cb, cr): (Value, i64, i64, i64)| {
            let index = slot_arg(&index)?;
            ctx.draw(|d| d.assign_color_ycbcr(index, y, cb, cr))
        },
    )?;
    bind(lua, &display, ctx, "set_brightness", |_, ctx, level: i64| {
        Ok(ctx.host.with_display(|d| d.set_brightness(level)))
    })?;
    bind(lua, &display, ctx, "write_register", |_, ctx, (register, value): (i64, i64)| {
        ctx.host.with_display(|d| d.write_register(register, value));
        Ok(())
    })?;
    bind(lua, &display, ctx, "power_save", |_, ctx, enable: bool| {
        ctx.host.with_display(|d| d.power_save(enable));
        Ok(())
    })?;

    Ok(display)
}

fn input_table(lua: &Lua, ctx: &Rc<ScriptContext>) -> mlua::Result<Table> {
    let input = lua.create_table()?;
    bind(lua, &input, ctx, "is_key_pressed", |_, ctx, name: String| {
        Ok(ctx.host.is_key_pressed(&name))
    })?;
    Ok(input)
}

fn time_table(lua: &Lua, ctx: &Rc<ScriptContext>) -> mlua::Result<Table> {
    let time = lua.create_table()?;
    bind(lua, &time, ctx, "utc", |_, ctx, ()| Ok(ctx.host.uptime_secs()))?;
    Ok(time)
}

fn bluetooth_table(lua: &Lua, ctx: &Rc<ScriptContext>) -> mlua::Result<Table> {
    let bluetooth = lua.create_table()?;
    bind(lua, &bluetooth, ctx, "send", |_, ctx, data: mlua::String| {
        let data = data.as_bytes().to_vec();
        if data.len() > MAX_PACKET_LENGTH {
            return Err(mlua::Error::RuntimeError(format!(
                "payload of {} bytes exceeds the {MAX_PACKET_LENGTH}-byte limit",
                data.len()
            )));
        }
        ctx.host.send(data);
        Ok(true)
    })?;
    bind(lua, &bluetooth, ctx, "max_length", |_, _, ()| Ok(MAX_PACKET_LENGTH))?;
    bind(
        lua,
        &bluetooth,
        ctx,
        "receive_callback",
        |lua, _, callback: Option<Function>| {
            lua.set_named_registry_value(RECEIVE_CALLBACK, callback)?;
            Ok(true)
        },
    )?;
    Ok(bluetooth)
}

// ---------------------------------------------------------------------------
// Virtual files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileMode {
    Read,
    Write,
}

/// Handle returned by `frame.file.open`. Writes are buffered and land in the
/// store on `close`.
struct FileHandle {
    host: Arc<Host>,
    path: String,
    mode: FileMode,
    buffer: Vec<u8>,
    cursor: usize,
    closed: bool,
}

impl FileHandle {
    fn ensure(&self, mode: FileMode) -> mlua::Result<()> {
        if self.closed {
            return Err(mlua::Error::RuntimeError(format!("{} is closed", self.path)));
        }
        if self.mode != mode {
            let verb = if mode == FileMode::Read { "reading" } else { "writing" };
            return Err(mlua::Error::RuntimeError(format!(
                "{} not opened for {verb}",
                self.path
            )));
        }
        Ok(())
    }
}

impl UserData for FileHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method_mut("write", |_, this, data: mlua::String| {
            this.ensure(FileMode::Write)?;
            this.buffer.extend_from_slice(&data.as_bytes());
            Ok(())
        });
        // Returns the rest of the file, or nil once exhausted.
        methods.add_method_mut("read", |lua, this, ()| {
            this.ensure(FileMode::Read)?;
            if this.cursor >= this.buffer.len() {
                return Ok(None);
            }
            let chunk = lua.create_string(&this.buffer[this.cursor..])?;
            this.cursor = this.buffer.len();
            Ok(Some(chunk))
        });
        methods.add_method_mut("close", |_, this, ()| {
            if !this.closed && this.mode == FileMode::Write {
                this.host.write_file(&this.path, std::mem::take(&mut this.buffer));
            }
            this.closed = true;
            Ok(())
        });
    }
}

fn file_table(lua: &Lua, ctx: &Rc<ScriptContext>) -> mlua::Result<Table> {
    let file = lua.create_table()?;
    bind(lua, &file, ctx, "open", |_, ctx, (path, mode): (String, Option<String>)| {
        let mode = match mode.as_deref().unwrap_or("read") {
            "read" | "r" => FileMode::Read,
            "write" | "w" => FileMode::Write,
            other => {
                return Err(mlua::Error::RuntimeError(format!("unknown file mode '{other}'")));
            }
        };
        let buffer = match mode {
            FileMode::Read => match ctx.host.read_file(&path) {
                Some(contents) => contents,
                None => return Ok(None),
            },
            FileMode::Write => Vec::new(),
        };
        Ok(Some(FileHandle {
            host: Arc::clone(&ctx.host),
            path,
            mode,
            buffer,
            cursor: 0,
            closed: false,
        }))
    })?;
    bind(lua, &file, ctx, "remove", |_, ctx, path: String| Ok(ctx.host.remove_file(&path)))?;
    bind(lua, &file, ctx, "exists", |_, ctx, path: String| Ok(ctx.host.file_exists(&path)))?;
    Ok(file)
}

/// `print` that writes to the log instead of stdout.
fn print_function(lua: &Lua) -> mlua::Result<Function> {
    lua.create_function(|lua, args: Variadic<Value>| {
        let tostring: Function = lua.globals().get("tostring")?;
        let mut line = String::new();
        for (i, value) in args.into_iter().enumerate() {
            if i > 0 {
                line.push('\t');
            }
            let text: mlua::String = tostring.call(value)?;
            line.push_str(&text.to_string_lossy());
        }
        info!(target: SCRIPT_LOG_TARGET, "{line}");
        Ok(())
    })
}
