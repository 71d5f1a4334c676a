// nodescript: graph-based visual scripting runtime.
//
// This program is free software: you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public License
// as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this program.  If not, see
// <https://www.gnu.org/licenses/>.

use std::env::args;
use std::fs;
use std::process::exit;
use std::time::Instant;

use nodescript::codec;
use nodescript::config;
use nodescript::data::VariableDump;
use nodescript::graph::Graph;
use nodescript::output;
use nodescript::registry;
use nodescript::vm::{RunResult, ScriptInstance};


// RON descriptions load through the config layer, anything else is
// treated as a binary .script container.
fn load_graph(path: &str) -> Result<Graph, String> {
    if path.ends_with(".ron") {
        config::load(path).map_err(|error| error.to_string())
    } else {
        let bytes = fs::read(path).map_err(|error| error.to_string())?;
        let records = codec::decode(&bytes).map_err(|error| error.to_string())?;
        Graph::read(&records).map_err(|error| error.to_string())
    }
}

fn main() {
    env_logger::init();
    registry::register_defaults();
    output::install(|message| println!("{}", message));

    let path = match args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: nodescript <script.ron|script.script> [entry]");
            exit(2);
        }
    };
    let entry = args().nth(2).unwrap_or_else(|| String::from("Entry"));

    let graph = match load_graph(&path) {
        Ok(graph) => graph,
        Err(error) => {
            eprintln!("couldn't load {}: {}", path, error);
            exit(1);
        }
    };

    let mut instance = ScriptInstance::new(&graph);
    let started = Instant::now();
    let result = instance.run(&entry);
    let elapsed = started.elapsed().as_secs_f64();

    log::debug!("globals: {}", VariableDump::capture(&instance).to_json());

    match result {
        RunResult::Complete => eprintln!("script time = {:.6}s", elapsed),
        other => {
            eprintln!("script {:?} did not finish: {:?}", entry, other);
            exit(1);
        }
    }
}
