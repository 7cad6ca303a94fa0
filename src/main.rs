fn main() {
  bookshelf_lib::run()
}
