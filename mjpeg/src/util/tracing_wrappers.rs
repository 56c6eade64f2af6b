// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

// Import these by name: a glob import of `warn` is ambiguous with the
// built-in `#[warn]` attribute.

#[cfg(feature = "tracing")]
#[allow(unused_imports)]
pub use tracing::{debug, error, info, trace, warn};

// The stubs expand to `()` so that they also work in expression position.
#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
mod disabled {
    macro_rules! debug {
        ($($arg:tt)*) => {
            ()
        };
    }
    macro_rules! error {
        ($($arg:tt)*) => {
            ()
        };
    }
    macro_rules! info {
        ($($arg:tt)*) => {
            ()
        };
    }
    macro_rules! trace {
        ($($arg:tt)*) => {
            ()
        };
    }
    macro_rules! warn_ {
        ($($arg:tt)*) => {
            ()
        };
    }
    #[allow(unused_imports)]
    pub(crate) use {debug, error, info, trace, warn_ as warn};
}
#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use disabled::{debug, error, info, trace, warn};

#[cfg(test)]
mod tests {
    use super::{debug, error, info, trace, warn};

    fn outcome(value: Result<u8, &str>) -> u8 {
        match value {
            Ok(v) => v,
            Err(_e) => {
                warn!(error = %_e, "falling back");
                0
            }
        }
    }

    #[test]
    fn test_macros_in_statement_and_expression_position() {
        let code = 7u8;
        debug!(code, "statement");
        trace!("statement {}", code);
        info!(code, "statement");
        match code {
            0 => warn!("match arm"),
            1 => error!(code, "match arm"),
            _ => debug!(code, "match arm"),
        }
        assert_eq!(outcome(Ok(3)), 3);
        assert_eq!(outcome(Err("bad")), 0);
    }
}
