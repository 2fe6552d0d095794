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

// See the tests for examples

pub struct ChunkIterator
{
    step_size: usize,
    num_steps: usize,
    cur_step: usize,
    start: usize,
    end: usize,
}

impl ChunkIterator
{
    ///
    /// Inclusive [start, end]
    pub fn new(start: usize, end: usize, step_size: usize) -> Self {

        assert!(end >= start);
        assert!(step_size >= 1);

        let range_len = end-start;
        let mut num_steps = 1 + range_len / step_size;
        if range_len % step_size > 0 {
            num_steps += 1
        }

        ChunkIterator {
            step_size,
            start,
            end,
            num_steps,
            cur_step: 0
        }
    }

    fn current(&self) -> usize {

        if self.cur_step >= self.num_steps - 1 {
            return self.end;
        }

        self.start + self.step_size * self.cur_step
    }

    fn go_back(&mut self) {
        if self.cur_step > 0 {
            self.cur_step -= 1;
        }
    }

    pub fn reset(&mut self) {
        self.cur_step = 0;
    }
}

impl Iterator for ChunkIterator
{
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {

        if self.cur_step >= self.num_steps {
            return None;
        }

        let r = self.current();

        self.cur_step += 1;

        Some(r)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let l = self.num_steps - self.cur_step;
        (l, Some(l))
    }
}

impl ExactSizeIterator for ChunkIterator {}

/// Splits [start, end] into consecutive inclusive ranges of at most step_size
pub struct ChunkPairIterator
{
    chunk_iter: ChunkIterator,
}

impl ChunkPairIterator
{
    ///
    /// Start and end are inclusive
    pub fn new(start: usize, end: usize, step_size: usize) -> Self {

        let chunk_iter = ChunkIterator::new(start, end+1, step_size);

        //should always have at least 2 elements, because we added 1 to the end
        assert!(chunk_iter.size_hint().0 > 1);

        ChunkPairIterator {
            chunk_iter,
        }
    }

    pub fn reset(&mut self) {
        self.chunk_iter.reset();
    }
}

impl Iterator for ChunkPairIterator
{
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {

        if let Some(lower_bound_inc) = self.chunk_iter.next() {

            if let Some(upper_bound_inc) = self.chunk_iter.next() {
                self.chunk_iter.go_back();
                return Some( (lower_bound_inc, upper_bound_inc - 1) )
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let sh = self.chunk_iter.size_hint();

        if sh.0 <= 1 {
            (0, Some(0))
        } else {
            (sh.0 - 1, Some(sh.0 - 1))
        }
    }
}

impl ExactSizeIterator for ChunkPairIterator {}

#[cfg(test)]
mod chunk_iterator_tests {

    use super::*;

    #[test]
    fn test_chunk_iter() {
        let v : Vec<_> = ChunkIterator::new(0, 10, 3).collect();
        assert_eq!(v, vec![0, 3, 6, 9, 10]);

        //always includes the end
        let v : Vec<_> = ChunkIterator::new(4, 5, 30).collect();
        assert_eq!(v, vec![4, 5]);

        let v : Vec<_> = ChunkIterator::new(4, 4, 1).collect();
        assert_eq!(v, vec![4]);
    }

    #[test]
    fn test_pair_chunk_iter() {
        let v : Vec<_> = ChunkPairIterator::new(0, 10, 3).collect();
        assert_eq!(v, vec![(0, 2), (3, 5), (6, 8), (9, 10)]);

        let v : Vec<_> = ChunkPairIterator::new(3, 5, 30).collect();
        assert_eq!(v, vec![(3, 5)]);

        let v : Vec<_> = ChunkPairIterator::new(4, 4, 1).collect();
        assert_eq!(v, vec![(4, 4)]);

        let v : Vec<_> = ChunkPairIterator::new(0, 54, 10).collect();
        assert_eq!(v, vec![(0, 9), (10, 19), (20, 29), (30, 39), (40, 49), (50, 54)]);
    }

    #[test]
    fn test_pair_chunk_iter_len() {
        let mut it = ChunkPairIterator::new(0, 54, 10);
        assert_eq!(it.len(), 6);
        it.next();
        assert_eq!(it.len(), 5);
    }
}
