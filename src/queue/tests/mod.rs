//! Test module organization for the queue
