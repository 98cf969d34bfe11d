use minijinja::{Environment, Error, ErrorKind, Value};

/// Registers the layout helpers every set carries.
///
/// Outside a layout call `yield()` and `partial()` fail and `current()`
/// returns an empty string. A layout render shadows all three with
/// page-bound versions through its context.
pub fn register_helpers(env: &mut Environment<'_>) {
    env.add_function("yield", || -> Result<Value, Error> {
        Err(Error::new(
            ErrorKind::InvalidOperation,
            "yield called with no layout defined",
        ))
    });
    env.add_function("partial", |_name: String| -> Result<Value, Error> {
        Err(Error::new(
            ErrorKind::InvalidOperation,
            "partial called with no layout defined",
        ))
    });
    env.add_function("current", String::new);
}
