pub mod assemble;
pub mod diagnostics;
pub mod gofmt;
pub mod goparse;
pub mod gotype;
pub mod imports;
pub mod mapper;
pub mod model;
pub mod namespace;
pub mod params;
pub mod registry;
pub mod sink;
pub mod synth;

mod xml;
