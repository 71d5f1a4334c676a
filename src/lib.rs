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

extern crate regex;
extern crate ron;
extern crate serde;
#[macro_use]
extern crate lazy_static;


pub mod codec;
pub mod config;
pub mod data;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod output;
pub mod registry;
pub mod value;
pub mod vm;
