mod parallel;
mod restart;
