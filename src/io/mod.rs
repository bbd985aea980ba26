//! io utilities : matrix market and Lamg files, csv dense matrices and edge lists, bson dump of embeddings.

pub mod mtx;

pub mod csv;

pub mod embeddedbson;

pub mod output;
