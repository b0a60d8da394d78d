/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

/// macro to flatten nested "if let .." trees into a sequence of pattern bindings. The body is only
/// executed if all patterns match. Each binding can use the variables bound by its predecessors.
///
/// ```ignore
/// if_let! {
///     Some(cap) = FILENAME_RE.captures(filename),
///     Ok(year) = cap[1].parse::<i32>(),
///     Some(nd) = NaiveDate::from_yo_opt( year, doy) => {
///         return Some(nd)
///     }
/// }
/// ```
/// expands into
/// ```ignore
/// if let Some(cap) = FILENAME_RE.captures(filename) {
///     if let Ok(year) = cap[1].parse::<i32>() {
///         if let Some(nd) = NaiveDate::from_yo_opt( year, doy) {
///             return Some(nd)
///         }
///     }
/// }
/// ```
/// Leafs can have an `else` block (both the match expression and the else clause have to be blocks then)
#[macro_export]
macro_rules! if_let {
    //--- the leafs
    { $p:pat = $x:block else $e:block => $r:expr } => {
        if let $p = $x { $r } else $e
    };
    { $p:pat = $x:expr => $r:expr } => {
        if let $p = $x { $r }
    };

    //--- the recursive tt munchers
    { $p:pat = $x:block else $e:block , $($ts:tt)+ } => {
        if let $p = $x { $crate::if_let! { $($ts)+ } } else $e
    };
    { $p:pat = $x:expr , $($ts:tt)+ } => {
        if let $p = $x {
            $crate::if_let! { $($ts)+ }
        }
    };
}
pub use if_let; // preserve 'macros' module across crates

/// create a std::io::Error from an ErrorKind and a format string
#[macro_export]
macro_rules! io_error {
    ( $kind:expr, $fmt:literal $(, $($arg:expr),* )? ) =>
    {
        std::io::Error::new( $kind, format!($fmt, $( $($arg),* )?))
    }
}
pub use io_error;

/// syntactic sugar macro to define thiserror Error enums:
/// ```ignore
/// define_error!{ pub OdinNetError =
///   IOError( #[from] std::io::Error ) : "IO error: {0}",
///   OpFailed(String) : "operation failed: {0}"
/// }
/// ```
/// will get expanded into
/// ```ignore
/// #[derive(thiserror::Error,Debug)]
/// pub enum OdinNetError {
///     #[error("IO error: {0}")]
///     IOError(#[from] std::io::Error),
///
///     #[error("operation failed: {0}")]
///     OpFailed(String),
/// }
/// ```
/// the using crate has to depend on `thiserror`
#[macro_export]
macro_rules! define_error {
    ($vis:vis $name:ident = $( $err_variant:ident ( $( $( #[$meta:meta] )? $field_type:ty),* ) : $msg_lit:literal ),* $(,)?) => {
        #[derive(thiserror::Error,Debug)]
        $vis enum $name {
            $(
                #[error($msg_lit)]
                $err_variant ( $( $(#[$meta])? $field_type ),*  )
            ),*
        }
    }
}
pub use define_error;

/* #region define_cli ********************************************************************************************/

/// syntactic sugar macro to define a global (lazy) `clap` command line argument struct. This is only meant to be
/// used from within binaries, the using crate has to depend on `clap` and `lazy_static`.
/// ```ignore
/// define_cli! { ARGS [about="GOES-R scene to PNG converter"] =
///     resolution: u32 [help="render resolution in dpi", long, default_value_t=300],
///     nc_path: String [help="pathname of netCDF input file"]
/// }
/// ```
/// will get expanded into
/// ```ignore
/// #[derive(clap::Parser)]
/// #[command(about="GOES-R scene to PNG converter")]
/// struct CliOpts {
///     #[arg(help="render resolution in dpi", long, default_value_t=300)]
///     resolution: u32,
///     #[arg(help="pathname of netCDF input file")]
///     nc_path: String
/// }
/// lazy_static! { static ref ARGS: CliOpts = CliOpts::parse(); }
/// ```
#[macro_export]
macro_rules! define_cli {
    ($name:ident [ $( $sopt:ident $(= $sx:expr)? ),* ] = $( $( #[$meta:meta] )? $fname:ident : $ftype:ty [ $( $fopt:ident $(= $fx:expr)?),* ] ),* $(,)?) => {
        use clap::Parser;
        use lazy_static::lazy_static;

        #[derive(Parser)]
        #[command( $( $sopt $(=$sx)? ),* )]
        struct CliOpts {
            $(
                #[arg( $( $fopt $(=$fx)? ),* )]
                $(#[$meta])?
                $fname : $ftype,
            )*
        }
        lazy_static! { static ref $name: CliOpts = CliOpts::parse(); }
    }
}
pub use define_cli;

/* #endregion define_cli */
