// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Time ranges, windows and window-size samplers

pub mod range;
pub mod sampler;
pub mod window;

pub use range::Range;
pub use sampler::{
    DownSampler, FixedSampler, SlotCountSampler, TimeWindowSampler, ONE_DAY, ONE_HOUR,
    ONE_MINUTE, ONE_SECOND, SLOT_SIZE_CANDIDATES,
};
pub use window::{Slots, TimeWindow};
