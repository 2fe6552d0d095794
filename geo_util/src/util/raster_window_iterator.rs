/*
This file is part of the Building Aggregration Tool
Copyright (C) 2022 Novel-T

The Building Aggregration Tool is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use crate::util::ChunkPairIterator;

/// Walks a raster of n_rows x n_cols in windows of at most max_window_size x max_window_size,
/// row of windows by row of windows
pub struct RasterChunkIterator
{
    num_steps: usize,

    x_pair_it: ChunkPairIterator,
    y_pair_it: ChunkPairIterator,
    num_col_chunks: usize,
    cur_step: usize,

    current_y_pair: Option< (usize, usize) >
}

#[derive(Debug)]
pub struct RasterChunkIteratorItem
{
    //X, Y  or column, row order
    pub window_size: (usize, usize),

    pub window_offset: (usize, usize),

    pub current_step: usize,
    pub num_steps: usize
}

impl RasterChunkIterator
{
    pub fn new(n_rows: usize, n_cols: usize, max_window_size: usize) -> Self {

        assert!(n_rows > 0);
        assert!(n_cols > 0);
        assert!(max_window_size > 0);

        let y_it = ChunkPairIterator::new(0, n_rows - 1, max_window_size);
        let x_it = ChunkPairIterator::new(0, n_cols - 1, max_window_size);
        let x_it_len = x_it.len();

        Self {
            num_steps: y_it.len() * x_it_len,

            x_pair_it: x_it,
            y_pair_it: y_it,
            num_col_chunks: x_it_len,

            cur_step: 0,

            current_y_pair: None
        }
    }
}

impl Iterator for RasterChunkIterator
{
    type Item = RasterChunkIteratorItem;

    fn next(&mut self) -> Option<Self::Item> {

        if self.cur_step >= self.num_steps {
            return None;
        }

        let chunk_col = self.cur_step % self.num_col_chunks;

        if chunk_col == 0 {
            self.current_y_pair = self.y_pair_it.next()
        }

        let y_val = self.current_y_pair?;
        let x_val = self.x_pair_it.next()?;

        if chunk_col == self.num_col_chunks - 1 {
            self.x_pair_it.reset();
        }

        let window_size = (1 + x_val.1 - x_val.0, 1 + y_val.1 - y_val.0);
        let window_offset = (x_val.0, y_val.0);

        let r = Some( RasterChunkIteratorItem {
            window_size,
            window_offset,
            current_step: self.cur_step,
            num_steps: self.num_steps
        });

        self.cur_step += 1;

        r
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let l = self.num_steps - self.cur_step;
        (l, Some(l))
    }
}

impl ExactSizeIterator for RasterChunkIterator {}

#[cfg(test)]
mod raster_window_iterator_tests {
    use super::*;

    #[test]
    fn test_window_iter_4chunks() {
        let mut it = RasterChunkIterator::new(5, 5, 3);
        assert_eq!(4, it.len());

        let item = it.next().unwrap();

        assert_eq!( (3,3), item.window_size);
        assert_eq!( (0,0), item.window_offset);

        let item = it.next().unwrap();

        assert_eq!( (2,3), item.window_size);
        assert_eq!( (3,0), item.window_offset);

        let item = it.next().unwrap();

        assert_eq!( (3,2), item.window_size);
        assert_eq!( (0,3), item.window_offset);

        let item = it.next().unwrap();

        assert_eq!( (2,2), item.window_size);
        assert_eq!( (3,3), item.window_offset);

        assert!(it.next().is_none());
    }

    #[test]
    fn test_window_iter_1chunk() {
        let mut it = RasterChunkIterator::new(52, 15, 4096);
        assert_eq!(1, it.len());

        let item = it.next().unwrap();

        assert_eq!( (15,52), item.window_size);
        assert_eq!( (0,0), item.window_offset);

        assert!(it.next().is_none());
    }

    #[test]
    fn test_window_iter_covers_all_cells() {
        let (n_rows, n_cols) = (17, 23);
        let mut covered = vec![0; n_rows * n_cols];

        for item in RasterChunkIterator::new(n_rows, n_cols, 4) {
            for row in item.window_offset.1..item.window_offset.1 + item.window_size.1 {
                for col in item.window_offset.0..item.window_offset.0 + item.window_size.0 {
                    covered[row * n_cols + col] += 1;
                }
            }
        }

        assert!(covered.iter().all(|c| *c == 1));
    }
}
