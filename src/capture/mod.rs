//! Media capture: surfaces that draw the stage, recorders that encode what they draw and the
//! pipeline that owns one recording session for the duration of an export run.

pub(crate) mod audio;
pub(crate) mod ffmpeg;
pub(crate) mod pipeline;
pub(crate) mod raster;
pub(crate) mod recorder;
pub(crate) mod surface;
