// SPDX-License-Identifier: GPL-3.0-or-later

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;

/// Run `f` and prefix any errors with the string returned by `prefix`.
pub fn try_forward<F, R, C, S>(f: F, prefix: C) -> Result<R>
where
    F: FnOnce() -> Result<R>,
    C: FnOnce() -> S,
    S: Into<String>,
{
    f().map_err(|cause| -> Error {
        Box::new(Prefixed {
            prefix: prefix().into(),
            cause,
        })
    })
}

#[derive(Debug)]
struct Prefixed {
    prefix: String,
    cause: Error,
}
impl std::fmt::Display for Prefixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.prefix, self.cause)
    }
}
impl std::error::Error for Prefixed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prefix_is_prepended() {
        let result: Result<()> = try_forward(|| Err("boom".into()), || "loading page");
        assert_eq!(result.unwrap_err().to_string(), "loading page: boom");
    }

    #[test]
    fn ok_passes_through() {
        let result = try_forward(|| Ok(3), || "unused");
        assert_eq!(result.unwrap(), 3);
    }
}
